use time::macros::format_description;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

/// `RUST_LOG` wins when set; otherwise `info` with `--verbose`, `error` without.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn format_number(num: i64) -> String {
    let digits = num.unsigned_abs().to_string();
    let grouped = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    if num < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.threshold < 0 {
        anyhow::bail!("--threshold must not be negative");
    }

    if args.source.trim().is_empty() {
        anyhow::bail!("--source must not be empty");
    }

    Ok(())
}
