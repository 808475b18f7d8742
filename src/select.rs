use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::error::{Result, TrendError};
use crate::tidy::TidyTable;

#[derive(Debug, Deserialize)]
struct ListingRow {
    countries: String,
}

/// Reads the `countries` column, keeping first occurrences in file order.
pub fn read_country_listing<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut countries = Vec::new();

    for row in rdr.deserialize::<ListingRow>() {
        let row = row.map_err(|e| TrendError::Listing(e.to_string()))?;
        let name = row.countries.trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            countries.push(name.to_string());
        }
    }
    Ok(countries)
}

pub fn load_country_listing(path: &Path) -> Result<Vec<String>> {
    info!(action = "load", component = "country_listing", file_path = ?path, "Loading country listing");
    if !path.exists() {
        return Err(TrendError::Listing(format!(
            "listing file not found: {}",
            path.display()
        )));
    }
    let file = File::open(path)
        .map_err(|e| TrendError::Listing(format!("{}: {}", path.display(), e)))?;
    let countries = read_country_listing(file)?;
    info!(
        action = "loaded",
        component = "country_listing",
        country_count = countries.len(),
        file_path = ?path,
        "Loaded country listing"
    );
    Ok(countries)
}

/// Countries to plot: the listing's names when one is given (absent names are
/// kept and resolved later as lookup misses), otherwise every country in the
/// table in ascending order.
pub fn select_countries(table: &TidyTable, listing: Option<&Path>) -> Result<Vec<String>> {
    let start_time = Instant::now();
    let countries = match listing {
        Some(path) => load_country_listing(path)?,
        None => table.countries().map(str::to_string).collect(),
    };

    info!(
        action = "complete",
        component = "country_selection",
        from_listing = listing.is_some(),
        country_count = countries.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Selected countries"
    );
    Ok(countries)
}
