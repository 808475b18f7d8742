use anyhow::Result;
use casetrend::{print_summary, run, utils, Args};
use clap::Parser;
use tracing::error;

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);

    utils::validate_args(&args)?;

    match run(&args) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!(action = "abort", component = "main", error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
