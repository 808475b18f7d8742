use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::tidy::TidyTable;

/// Daily total for one country, summed over its subregions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryTotal {
    pub date: NaiveDate,
    pub confirmed: i64,
    pub country: String,
}

/// Sums `confirmed` per date across every subregion of `country`.
///
/// A country with no rows gives an empty result. Rows come back in date
/// order.
pub fn aggregate(table: &TidyTable, country: &str) -> Vec<CountryTotal> {
    let Ok(rows) = table.lookup(country) else {
        return Vec::new();
    };

    let mut by_date: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for row in rows {
        *by_date.entry(row.date).or_insert(0) += row.confirmed;
    }

    by_date
        .into_iter()
        .map(|(date, confirmed)| CountryTotal {
            date,
            confirmed,
            country: country.to_string(),
        })
        .collect()
}

/// True when the largest single-row count for `country` is strictly above
/// `threshold`. Unknown countries never pass.
pub fn filter_by_threshold(table: &TidyTable, country: &str, threshold: i64) -> bool {
    table
        .lookup(country)
        .ok()
        .and_then(|rows| rows.iter().map(|r| r.confirmed).max())
        .is_some_and(|max| max > threshold)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlottedCountry {
    pub country: String,
    pub latest_date: NaiveDate,
    pub latest_confirmed: i64,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub source: String,
    pub date_range: Option<(NaiveDate, NaiveDate, i64)>,
    pub tidy_rows: usize,
    pub selected: usize,
    pub plotted: Vec<PlottedCountry>,
    pub missing: Vec<String>,
    pub below_threshold: Vec<String>,
    pub output: Option<String>,
}
