use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use url::Url;

use crate::error::{Result, TrendError};
use crate::tidy::{canonical_column, IdColumn, RawRecord, RawTable};

/// Where the source CSV lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Http(Url),
    File(PathBuf),
}

impl Source {
    /// `http(s)://` goes over the network, `file://` and anything that is not
    /// an absolute URL is read from disk.
    pub fn resolve(name: &str) -> Result<Self> {
        match Url::parse(name) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Source::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(Source::File)
                    .map_err(|_| TrendError::fetch(name, "file URL has no usable path")),
                // Drive letters parse as one-character schemes
                scheme if scheme.len() == 1 => Ok(Source::File(PathBuf::from(name))),
                scheme => Err(TrendError::fetch(
                    name,
                    format!("unsupported scheme '{}'", scheme),
                )),
            },
            Err(_) => Ok(Source::File(PathBuf::from(name))),
        }
    }
}

/// Fetches the raw CSV text with a single blocking request or file read.
pub fn fetch_text(name: &str) -> Result<String> {
    let start_time = Instant::now();
    let source = Source::resolve(name)?;
    info!(action = "start", component = "fetch", source = ?source, "Fetching source CSV");

    let text = match &source {
        Source::Http(url) => {
            let response =
                reqwest::blocking::get(url.as_str()).map_err(|e| TrendError::fetch(name, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TrendError::fetch(name, format!("HTTP status {}", status)));
            }
            response.text().map_err(|e| TrendError::fetch(name, e))?
        }
        Source::File(path) => fs::read_to_string(path).map_err(|e| TrendError::fetch(name, e))?,
    };

    info!(
        action = "complete",
        component = "fetch",
        bytes = text.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Fetched source CSV"
    );
    Ok(text)
}

fn parse_number<T: std::str::FromStr + Default>(
    name: &str,
    cell: &str,
    column: &str,
    line: u64,
) -> Result<T> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(T::default());
    }
    cell.parse().map_err(|_| {
        TrendError::fetch(
            name,
            format!("line {}: column '{}' has non-numeric value '{}'", line, column, cell),
        )
    })
}

/// Decodes wide CSV text into a [`RawTable`]. Identifier columns are found by
/// their normalized label; every other column is a date column.
pub fn parse_raw_table(name: &str, text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| TrendError::fetch(name, e))?
        .clone();

    let mut subregion_col = None;
    let mut country_col = None;
    let mut lat_col = None;
    let mut long_col = None;
    let mut date_cols = Vec::new();

    for (idx, label) in headers.iter().enumerate() {
        match canonical_column(label) {
            Some(IdColumn::Subregion) => subregion_col = Some(idx),
            Some(IdColumn::Country) => country_col = Some(idx),
            Some(IdColumn::Lat) => lat_col = Some(idx),
            Some(IdColumn::Long) => long_col = Some(idx),
            None => date_cols.push(idx),
        }
    }

    let country_col =
        country_col.ok_or_else(|| TrendError::fetch(name, "missing Country/Region column"))?;
    if subregion_col.is_none() {
        warn!(action = "parse", component = "raw_table", "No Province/State column; subregions left empty");
    }

    let mut table = RawTable {
        date_labels: date_cols.iter().map(|&i| headers[i].to_string()).collect(),
        rows: Vec::new(),
    };

    for record in reader.records() {
        let record = record.map_err(|e| TrendError::fetch(name, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let country = cell(Some(country_col)).trim().to_string();
        let subregion = Some(cell(subregion_col).trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let lat: f64 = parse_number(name, cell(lat_col), "Lat", line)?;
        let long: f64 = parse_number(name, cell(long_col), "Long", line)?;
        let values = date_cols
            .iter()
            .map(|&i| parse_number(name, cell(Some(i)), &headers[i], line))
            .collect::<Result<Vec<i64>>>()?;

        table.rows.push(RawRecord {
            country,
            subregion,
            lat,
            long,
            values,
        });
    }

    info!(
        action = "parse",
        component = "raw_table",
        rows = table.rows.len(),
        date_columns = table.date_labels.len(),
        "Parsed wide source table"
    );
    Ok(table)
}

pub fn load_raw_table(name: &str) -> Result<RawTable> {
    let text = fetch_text(name)?;
    parse_raw_table(name, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WIDE: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
,Foo,0,0,0,5
Hubei,China,30.9756,112.2707,444,444
Beijing,China,40.1824,116.4142,14,22
";

    #[test]
    fn resolves_sources_by_scheme() {
        assert!(matches!(
            Source::resolve("https://example.com/data.csv").unwrap(),
            Source::Http(_)
        ));
        assert_eq!(
            Source::resolve("data/series.csv").unwrap(),
            Source::File(PathBuf::from("data/series.csv"))
        );
        assert_eq!(
            Source::resolve("file:///tmp/series.csv").unwrap(),
            Source::File(PathBuf::from("/tmp/series.csv"))
        );
        assert!(matches!(
            Source::resolve("ftp://example.com/data.csv"),
            Err(TrendError::Fetch { .. })
        ));
    }

    #[test]
    fn parses_wide_table() {
        let table = parse_raw_table("test", WIDE).unwrap();
        assert_eq!(table.date_labels, vec!["1/22/20", "1/23/20"]);
        assert_eq!(table.rows.len(), 3);

        let foo = &table.rows[0];
        assert_eq!(foo.country, "Foo");
        assert_eq!(foo.subregion, None);
        assert_eq!(foo.values, vec![0, 5]);

        let hubei = &table.rows[1];
        assert_eq!(hubei.subregion.as_deref(), Some("Hubei"));
        assert!((hubei.lat - 30.9756).abs() < 1e-9);
        assert_eq!(hubei.values, vec![444, 444]);
    }

    #[test]
    fn quoted_country_names_survive() {
        let text = "Province/State,Country/Region,Lat,Long,3/1/20\n,\"Korea, South\",36.0,128.0,3736\n";
        let table = parse_raw_table("test", text).unwrap();
        assert_eq!(table.rows[0].country, "Korea, South");
    }

    #[test]
    fn blank_cells_read_as_zero() {
        let text = "Province/State,Country/Region,Lat,Long,3/1/20,3/2/20\n,Foo,,,7,\n";
        let table = parse_raw_table("test", text).unwrap();
        assert_eq!(table.rows[0].values, vec![7, 0]);
        assert_eq!(table.rows[0].lat, 0.0);
    }

    #[test]
    fn non_numeric_count_is_a_fetch_error() {
        let text = "Province/State,Country/Region,Lat,Long,3/1/20\n,Foo,0,0,many\n";
        let err = parse_raw_table("test", text).unwrap_err();
        assert!(matches!(err, TrendError::Fetch { .. }));
        assert!(err.to_string().contains("3/1/20"));
    }

    #[test]
    fn missing_country_column_is_a_fetch_error() {
        let text = "Province/State,Lat,Long,3/1/20\nHubei,0,0,1\n";
        assert!(matches!(
            parse_raw_table("test", text),
            Err(TrendError::Fetch { .. })
        ));
    }

    #[test]
    fn loads_from_local_file() -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(WIDE.as_bytes())?;

        let path = tmp.path().to_string_lossy().to_string();
        let table = load_raw_table(&path)?;
        assert_eq!(table.rows.len(), 3);
        Ok(())
    }

    #[test]
    fn unreadable_file_is_a_fetch_error() {
        let result = load_raw_table("/nonexistent/casetrend/series.csv");
        assert!(matches!(result, Err(TrendError::Fetch { .. })));
    }
}
