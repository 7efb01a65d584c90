//! # bucket-audit
//!
//! Command-line entry point.
//!
//! ## Exit status
//!
//! Configuration and stats snapshot failures exit non-zero before any
//! scanning starts. Unreadable log files and unresolvable buckets are logged
//! and the report is still printed.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::io::Write;

use anyhow::{Context, Result};
use bucket_audit::{cli::Cli, commands::execute_command};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let output = execute_command(cli)?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .context("Failed to write report")?;
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
///
/// Logs go to stderr so stdout carries only the report.
fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
