use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

use crate::render::{palette_color, Chart, ChartSink, HtmlChart, Series};
use crate::stats::{aggregate, filter_by_threshold, PlottedCountry, RunSummary};
use crate::tidy::TidyTable;
use crate::{fetch, select, tidy, Args};

/// Aggregates and filters each selected country into chart series.
///
/// Every selected country takes the next palette color, whether or not it
/// ends up plotted. Unknown countries are logged and skipped.
pub fn build_chart(table: &TidyTable, countries: &[String], threshold: i64) -> (Chart, RunSummary) {
    let mut chart = Chart {
        x_range: table.date_range(),
        series: Vec::new(),
    };
    let mut summary = RunSummary {
        selected: countries.len(),
        ..RunSummary::default()
    };

    for (position, country) in countries.iter().enumerate() {
        let color = palette_color(position);

        if let Err(e) = table.lookup(country) {
            warn!(action = "lookup", component = "country_selection", country = %country, error = %e, "Skipping country");
            summary.missing.push(country.clone());
            continue;
        }

        if !filter_by_threshold(table, country, threshold) {
            info!(action = "filter", component = "threshold", country = %country, threshold, "Country below threshold");
            summary.below_threshold.push(country.clone());
            continue;
        }

        let totals = aggregate(table, country);
        if let Some(latest) = totals.last() {
            summary.plotted.push(PlottedCountry {
                country: country.clone(),
                latest_date: latest.date,
                latest_confirmed: latest.confirmed,
            });
        }
        chart.series.push(Series {
            country: country.clone(),
            color,
            totals,
        });
    }

    info!(
        action = "complete",
        component = "chart_build",
        plotted = summary.plotted.len(),
        missing = summary.missing.len(),
        below_threshold = summary.below_threshold.len(),
        "Built chart series"
    );
    (chart, summary)
}

/// fetch, reshape, select, aggregate, then hand the chart to `sink`.
pub fn run_with_sink(args: &Args, sink: Option<&mut dyn ChartSink>) -> Result<RunSummary> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "pipeline", source = %args.source, "Starting run");

    let raw = fetch::load_raw_table(&args.source)?;
    let table = tidy::reshape(raw)?;
    let countries = select::select_countries(&table, args.listing())?;

    let (chart, mut summary) = build_chart(&table, &countries, args.threshold);
    summary.source = args.source.clone();
    summary.tidy_rows = table.len();
    summary.date_range = table
        .date_range()
        .map(|(first, last)| (first, last, (last - first).num_days()));

    if let Some(sink) = sink {
        sink.render(&chart)?;
    }

    info!(
        action = "complete",
        component = "pipeline",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Run completed"
    );
    Ok(summary)
}

/// Runs the pipeline, writing the HTML chart unless `--no-render` is set.
pub fn run(args: &Args) -> Result<RunSummary> {
    if args.no_render {
        return run_with_sink(args, None);
    }
    let mut sink = HtmlChart::new(&args.output);
    let mut summary = run_with_sink(args, Some(&mut sink))?;
    summary.output = Some(sink.path().display().to_string());
    Ok(summary)
}

pub fn print_summary(summary: &RunSummary) {
    use crate::utils::format_number;

    println!("\n--- Confirmed cases: {} ---", summary.source);

    match summary.date_range {
        Some((first, last, days)) => println!(
            "Date range: {} to {} ({} days)",
            first.format("%B %-d, %Y"),
            last.format("%B %-d, %Y"),
            format_number(days)
        ),
        None => println!("Date range: no data available"),
    }

    println!("Tidy rows: {}", format_number(summary.tidy_rows as i64));
    println!(
        "Countries selected: {}, plotted: {}, missing: {}, below threshold: {}",
        summary.selected,
        summary.plotted.len(),
        summary.missing.len(),
        summary.below_threshold.len()
    );

    if !summary.missing.is_empty() {
        println!("\nNo data for:");
        for country in &summary.missing {
            println!("- {}", country);
        }
    }

    if !summary.plotted.is_empty() {
        println!("\nLatest totals:");
        for plotted in &summary.plotted {
            println!(
                "- {}: {} confirmed ({})",
                plotted.country,
                format_number(plotted.latest_confirmed),
                plotted.latest_date
            );
        }
    }

    if let Some(output) = &summary.output {
        println!("\nChart written to {}", output);
    }
}
