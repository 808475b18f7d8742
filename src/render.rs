//! Chart output. The pipeline hands a [`Chart`] to a [`ChartSink`]; the
//! bundled [`HtmlChart`] writes a standalone Plotly.js page.

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::error::{Result, TrendError};
use crate::stats::CountryTotal;

/// Dark2, five colors.
pub const PALETTE: [&str; 5] = ["#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e"];

pub const MAIN_TITLE: &str = "Confirmed cases";
pub const OVERVIEW_TITLE: &str =
    "Drag the middle and edges of the selection box to change the range above";

const LINE_ALPHA: f64 = 0.8;
const MUTED_ALPHA: f64 = 0.2;
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// One line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub country: String,
    pub color: &'static str,
    pub totals: Vec<CountryTotal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    pub x_range: Option<(NaiveDate, NaiveDate)>,
    pub series: Vec<Series>,
}

pub trait ChartSink {
    fn render(&mut self, chart: &Chart) -> Result<()>;
}

/// Color for the `position`-th selected country, cycling through [`PALETTE`].
pub fn palette_color(position: usize) -> &'static str {
    PALETTE[position % PALETTE.len()]
}

fn trace(series: &Series) -> Value {
    // Plotting needs date order; aggregation already yields it but sort anyway
    let mut totals: Vec<&CountryTotal> = series.totals.iter().collect();
    totals.sort_by_key(|t| t.date);

    json!({
        "type": "scatter",
        "mode": "lines",
        "name": series.country,
        "x": totals.iter().map(|t| t.date.format("%Y-%m-%d").to_string()).collect::<Vec<_>>(),
        "y": totals.iter().map(|t| t.confirmed).collect::<Vec<_>>(),
        "line": { "color": series.color, "width": 2 },
        "opacity": LINE_ALPHA,
        "hovertemplate":
            "country: %{fullData.name}<br>date: %{x|%Y-%m-%d}<br>confirmed: %{y}<extra></extra>",
    })
}

/// Plotly figure: one trace per series, a range slider as the overview pane.
pub fn figure(chart: &Chart) -> Value {
    let mut xaxis = json!({
        "type": "date",
        "rangeslider": {
            "visible": true,
            "thickness": 0.25,
            "bgcolor": "#efefef",
            "bordercolor": "navy",
        },
    });
    if let Some((first, last)) = chart.x_range {
        xaxis["range"] = json!([
            first.format("%Y-%m-%d").to_string(),
            last.format("%Y-%m-%d").to_string()
        ]);
    }

    json!({
        "data": chart.series.iter().map(trace).collect::<Vec<_>>(),
        "layout": {
            "title": { "text": MAIN_TITLE },
            "width": 1200,
            "height": 530,
            "xaxis": xaxis,
            "yaxis": { "title": { "text": MAIN_TITLE } },
            "hovermode": "closest",
            "legend": { "x": 0.01, "y": 0.99, "xanchor": "left", "yanchor": "top" },
            "annotations": [{
                "text": OVERVIEW_TITLE,
                "showarrow": false,
                "xref": "paper",
                "yref": "paper",
                "x": 0,
                "y": -0.45,
                "xanchor": "left",
            }],
        },
    })
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<script src="{{PLOTLY}}"></script>
</head>
<body>
<div id="chart"></div>
<script>
var figure = {{FIGURE}};
var chart = document.getElementById("chart");
Plotly.newPlot(chart, figure.data, figure.layout);
chart.on("plotly_legendclick", function (evt) {
  var idx = evt.curveNumber;
  var muted = chart.data[idx].opacity === {{MUTED}};
  Plotly.restyle(chart, { opacity: muted ? {{ALPHA}} : {{MUTED}} }, [idx]);
  return false;
});
</script>
</body>
</html>
"#;

/// Full HTML page for `chart`.
pub fn build_html(chart: &Chart) -> Result<String> {
    // A country name containing "</script>" must not close the tag
    let figure = serde_json::to_string(&figure(chart))?.replace("</", "<\\/");
    Ok(PAGE_TEMPLATE
        .replace("{{TITLE}}", MAIN_TITLE)
        .replace("{{PLOTLY}}", PLOTLY_CDN)
        .replace("{{MUTED}}", &MUTED_ALPHA.to_string())
        .replace("{{ALPHA}}", &LINE_ALPHA.to_string())
        .replace("{{FIGURE}}", &figure))
}

pub struct HtmlChart {
    path: PathBuf,
}

impl HtmlChart {
    pub fn new(path: impl AsRef<Path>) -> Self {
        HtmlChart {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChartSink for HtmlChart {
    fn render(&mut self, chart: &Chart) -> Result<()> {
        let start_time = Instant::now();
        let html = build_html(chart)?;
        fs::write(&self.path, html)
            .map_err(|e| TrendError::Render(format!("{}: {}", self.path.display(), e)))?;
        info!(
            action = "complete",
            component = "render",
            series = chart.series.len(),
            file_path = ?self.path,
            duration_ms = start_time.elapsed().as_millis(),
            "Chart written"
        );
        Ok(())
    }
}
