use anyhow::{Context, anyhow};
use decksweep_core::domain::Dimension;
use decksweep_core::sweep::{SweepReport, render_human_summary, write_report};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use super::CliError;

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the stderr log subscriber. An explicit `--log-level` wins over
/// `RUST_LOG`, which wins over the default filter.
pub(super) fn init_tracing(log_level: Option<&str>) -> anyhow::Result<()> {
    let filter = match log_level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid --log-level '{}'", directives))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("failed to install log subscriber: {}", error))
}

/// Accepts the short field names used in case folder names (`BHP`, `SKIN`,
/// `QINJ`, `SO`, `P`, `ORAT`), case-insensitively.
pub(super) fn parse_dimension(value: &str) -> Result<Dimension, String> {
    Dimension::ALL
        .into_iter()
        .find(|dimension| dimension.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| {
            let known = Dimension::ALL
                .iter()
                .map(|dimension| dimension.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("unknown dimension '{}'; expected one of {}", value, known)
        })
}

pub(super) fn finish_sweep(report: &SweepReport, report_path: Option<&Path>) -> Result<i32, CliError> {
    println!("{}", render_human_summary(report));
    if let Some(report_path) = report_path {
        write_report(report_path, report)?;
        println!("JSON report: {}", report_path.display());
    }

    if report.succeeded() { Ok(0) } else { Ok(1) }
}
