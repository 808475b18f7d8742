use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, TrendError};

pub const DATE_LABEL_FORMAT: &str = "%m/%d/%y";

/// Identifier columns of the wide source table, under their canonical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdColumn {
    Subregion,
    Country,
    Lat,
    Long,
}

/// One row of the wide source table. `values` lines up with
/// [`RawTable::date_labels`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub country: String,
    pub subregion: Option<String>,
    pub lat: f64,
    pub long: f64,
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub date_labels: Vec<String>,
    pub rows: Vec<RawRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TidyRecord {
    pub country: String,
    pub subregion: Option<String>,
    pub lat: f64,
    pub long: f64,
    pub date: NaiveDate,
    pub confirmed: i64,
}

/// Long-format table sorted by (country, subregion, lat, long, date), with
/// each country's rows kept contiguous.
#[derive(Debug, Clone, Default)]
pub struct TidyTable {
    records: Vec<TidyRecord>,
    index: BTreeMap<String, Range<usize>>,
}

fn label_key(label: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid label regex"));
    re.replace_all(&label.trim().to_lowercase(), "").into_owned()
}

/// Maps a source header label to its canonical id column, ignoring case and
/// punctuation. Returns `None` for date columns.
pub fn canonical_column(label: &str) -> Option<IdColumn> {
    match label_key(label).as_str() {
        "provincestate" | "subregion" => Some(IdColumn::Subregion),
        "countryregion" | "country" => Some(IdColumn::Country),
        "lat" => Some(IdColumn::Lat),
        "long" => Some(IdColumn::Long),
        _ => None,
    }
}

pub fn parse_date_label(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), DATE_LABEL_FORMAT).map_err(|_| TrendError::DateParse {
        label: label.to_string(),
    })
}

fn compare_records(a: &TidyRecord, b: &TidyRecord) -> Ordering {
    a.country
        .cmp(&b.country)
        .then_with(|| a.subregion.cmp(&b.subregion))
        .then_with(|| a.lat.total_cmp(&b.lat))
        .then_with(|| a.long.total_cmp(&b.long))
        .then_with(|| a.date.cmp(&b.date))
}

/// Unpivots the wide table into one row per (record, date column).
///
/// Date labels are parsed once per column; a single bad label fails the
/// whole reshape. Counts are kept exactly as read, zeros and ones included.
pub fn reshape(raw: RawTable) -> Result<TidyTable> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "reshape",
        raw_rows = raw.rows.len(),
        date_columns = raw.date_labels.len(),
        "Reshaping wide table"
    );

    let dates = raw
        .date_labels
        .iter()
        .map(|label| parse_date_label(label))
        .collect::<Result<Vec<NaiveDate>>>()?;

    let mut records = Vec::with_capacity(raw.rows.len() * dates.len());
    for row in raw.rows {
        for (date, confirmed) in dates.iter().zip(row.values.iter()) {
            records.push(TidyRecord {
                country: row.country.clone(),
                subregion: row.subregion.clone(),
                lat: row.lat,
                long: row.long,
                date: *date,
                confirmed: *confirmed,
            });
        }
    }

    let table = TidyTable::from_records(records);

    info!(
        action = "complete",
        component = "reshape",
        tidy_rows = table.len(),
        countries = table.index.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Reshape completed"
    );
    Ok(table)
}

impl TidyTable {
    pub fn from_records(mut records: Vec<TidyRecord>) -> Self {
        records.sort_by(compare_records);

        let mut index: BTreeMap<String, Range<usize>> = BTreeMap::new();
        let mut start = 0;
        while start < records.len() {
            let country = &records[start].country;
            let end = start
                + records[start..]
                    .iter()
                    .take_while(|r| &r.country == country)
                    .count();
            index.insert(country.clone(), start..end);
            start = end;
        }
        debug!(
            action = "index",
            component = "tidy_table",
            countries = index.len(),
            "Built country index"
        );

        TidyTable { records, index }
    }

    pub fn records(&self) -> &[TidyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct countries in ascending order.
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn contains(&self, country: &str) -> bool {
        self.index.contains_key(country)
    }

    /// All rows for `country`, or [`TrendError::CountryLookupMiss`].
    pub fn lookup(&self, country: &str) -> Result<&[TidyRecord]> {
        self.index
            .get(country)
            .map(|range| &self.records[range.clone()])
            .ok_or_else(|| TrendError::CountryLookupMiss {
                country: country.to_string(),
            })
    }

    /// Earliest and latest date across the whole table.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw_row(country: &str, subregion: Option<&str>, values: &[i64]) -> RawRecord {
        RawRecord {
            country: country.to_string(),
            subregion: subregion.map(str::to_string),
            lat: 0.0,
            long: 0.0,
            values: values.to_vec(),
        }
    }

    fn sample_raw() -> RawTable {
        RawTable {
            date_labels: vec!["1/22/20".into(), "1/23/20".into(), "1/24/20".into()],
            rows: vec![
                raw_row("Zed", None, &[1, 1, 2]),
                raw_row("Bar", Some("North"), &[0, 3, 4]),
                raw_row("Bar", Some("South"), &[2, 2, 9]),
                raw_row("Foo", None, &[0, 5, 5]),
            ],
        }
    }

    #[test]
    fn canonical_column_ignores_case_and_punctuation() {
        assert_eq!(canonical_column("Province/State"), Some(IdColumn::Subregion));
        assert_eq!(canonical_column("country/region"), Some(IdColumn::Country));
        assert_eq!(canonical_column("Country_Region"), Some(IdColumn::Country));
        assert_eq!(canonical_column(" LAT "), Some(IdColumn::Lat));
        assert_eq!(canonical_column("Long_"), Some(IdColumn::Long));
        assert_eq!(canonical_column("1/22/20"), None);
    }

    #[test]
    fn parses_unpadded_two_digit_year_labels() {
        assert_eq!(parse_date_label("1/22/20").unwrap(), date(2020, 1, 22));
        assert_eq!(parse_date_label("12/3/21").unwrap(), date(2021, 12, 3));
    }

    #[test]
    fn rejects_labels_outside_the_date_format() {
        for label in ["2020-01-22", "Jan 22", "13/1/20", ""] {
            match parse_date_label(label) {
                Err(TrendError::DateParse { label: l }) => assert_eq!(l, label),
                other => panic!("expected DateParse for {label:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn reshape_yields_one_row_per_record_and_date() {
        let raw = sample_raw();
        let expected = raw.rows.len() * raw.date_labels.len();
        let table = reshape(raw).unwrap();
        assert_eq!(table.len(), expected);
    }

    #[test]
    fn reshape_fails_on_a_single_bad_label() {
        let mut raw = sample_raw();
        raw.date_labels[1] = "Confirmed".into();
        assert!(matches!(reshape(raw), Err(TrendError::DateParse { .. })));
    }

    #[test]
    fn reshape_sorts_by_country_subregion_then_date() {
        let table = reshape(sample_raw()).unwrap();
        let keys: Vec<(&str, Option<&str>, NaiveDate)> = table
            .records()
            .iter()
            .map(|r| (r.country.as_str(), r.subregion.as_deref(), r.date))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(table.countries().collect::<Vec<_>>(), vec!["Bar", "Foo", "Zed"]);
    }

    #[test]
    fn reshape_is_insensitive_to_row_order() {
        let raw = sample_raw();
        let mut permuted = raw.clone();
        permuted.rows.reverse();
        permuted.rows.swap(0, 2);

        let a = reshape(raw).unwrap();
        let b = reshape(permuted).unwrap();
        assert_eq!(a.records(), b.records());
    }

    #[test]
    fn reshape_keeps_zero_and_one_counts() {
        let table = reshape(sample_raw()).unwrap();
        let zed: Vec<i64> = table.lookup("Zed").unwrap().iter().map(|r| r.confirmed).collect();
        assert_eq!(zed, vec![1, 1, 2]);
        let foo = table.lookup("Foo").unwrap();
        assert_eq!(foo[0].confirmed, 0);
    }

    #[test]
    fn foo_scenario_reshapes_to_two_rows() {
        let raw = RawTable {
            date_labels: vec!["1/22/20".into(), "1/23/20".into()],
            rows: vec![raw_row("Foo", None, &[0, 5])],
        };
        let table = reshape(raw).unwrap();
        let rows: Vec<(NaiveDate, i64)> = table
            .lookup("Foo")
            .unwrap()
            .iter()
            .map(|r| (r.date, r.confirmed))
            .collect();
        assert_eq!(rows, vec![(date(2020, 1, 22), 0), (date(2020, 1, 23), 5)]);
    }

    #[test]
    fn lookup_miss_is_reported_not_panicked() {
        let table = reshape(sample_raw()).unwrap();
        match table.lookup("Atlantis") {
            Err(TrendError::CountryLookupMiss { country }) => assert_eq!(country, "Atlantis"),
            other => panic!("expected lookup miss, got {other:?}"),
        }
    }

    #[test]
    fn date_range_spans_all_columns() {
        let table = reshape(sample_raw()).unwrap();
        assert_eq!(table.date_range(), Some((date(2020, 1, 22), date(2020, 1, 24))));
        assert_eq!(TidyTable::default().date_range(), None);
    }
}
