//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `https_upgrade` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use https_upgrade::config::Opt;
use https_upgrade::initialization::init_logger_with;
use https_upgrade::run_check;

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    let log_level = opt.log_level.clone();
    let log_format = opt.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_check(opt).await {
        Ok(report) => {
            println!(
                "Checked {} URL{} ({} upgraded, {} downgraded, {} rewritten, {} fell back, {} passed, {} failed)",
                report.total,
                if report.total == 1 { "" } else { "s" },
                report.upgraded,
                report.downgraded,
                report.rewritten,
                report.fell_back,
                report.passed,
                report.failed
            );
            if report.failed > 0 {
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("https_upgrade error: {:#}", e);
            process::exit(1);
        }
    }
}
