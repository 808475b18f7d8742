pub mod args;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod render;
pub mod select;
pub mod stats;
pub mod tidy;
pub mod utils;

pub use args::Args;
pub use error::TrendError;
pub use pipeline::{print_summary, run};
pub use render::{Chart, ChartSink, HtmlChart, Series};
pub use stats::{aggregate, filter_by_threshold, CountryTotal, RunSummary};
pub use tidy::{reshape, TidyRecord, TidyTable};
