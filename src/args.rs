use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_SOURCE: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_19-covid-Confirmed.csv";
pub const DEFAULT_LISTING: &str = "data/main_countries.csv";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "casetrend",
    about = "Reshape a confirmed-cases time series and chart per-country totals",
    version,
    long_about = None
)]
pub struct Args {
    /// Source CSV: http(s) URL, file:// URL or local path
    #[arg(short, long, default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// CSV file with a `countries` column listing the countries to plot
    #[arg(short, long, default_value = DEFAULT_LISTING)]
    pub countries: PathBuf,

    /// Ignore the listing and plot every country in the source
    #[arg(long)]
    pub all_countries: bool,

    /// Plot a country only if its peak count is above this value
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub threshold: i64,

    /// Where to write the HTML chart
    #[arg(short, long, default_value = "covid_confirmed.html")]
    pub output: PathBuf,

    /// Skip writing the chart, print the summary only
    #[arg(long)]
    pub no_render: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The listing to read, or `None` when every country should be plotted.
    pub fn listing(&self) -> Option<&std::path::Path> {
        if self.all_countries {
            None
        } else {
            Some(self.countries.as_path())
        }
    }
}
