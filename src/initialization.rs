//! Logger and transport initialization.
//!
//! All shared resources are built here, before any request is sent: the
//! logger (env_logger with plain or JSON output) and the reqwest-backed
//! transport with redirect following disabled.

use std::io::Write;
use std::time::Duration;

use colored::*;
use log::LevelFilter;
use reqwest::ClientBuilder;

use crate::config::{LogFormat, Opt, PROBE_CONNECT_TIMEOUT_SECS, PROBE_READ_TIMEOUT_SECS};
use crate::error_handling::InitializationError;
use crate::transport::HttpTransport;

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with custom formatting. Supports both plain text
/// (with colors) and JSON formats for structured logging.
///
/// The logger reads from the `RUST_LOG` environment variable by default, but
/// the provided `level` parameter will override it.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if logger initialization fails.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();

    // CLI-provided level takes precedence over RUST_LOG
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("https_upgrade", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };

                writeln!(
                    buf,
                    "{} [{}] {}",
                    record.target().cyan(),
                    colored_level,
                    record.args()
                )
            });
        }
    }

    // try_init() instead of init() so tests can initialize repeatedly
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

/// Initializes the HTTP transport.
///
/// Creates a `reqwest::Client` configured with:
/// - Redirect following disabled (redirects are synthesized locally or
///   followed explicitly by the probe)
/// - Connect timeout of `PROBE_CONNECT_TIMEOUT_SECS`, read timeout of
///   `PROBE_READ_TIMEOUT_SECS`
/// - Overall per-request timeout and User-Agent from the options
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_transport(opt: &Opt) -> Result<HttpTransport, InitializationError> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(PROBE_CONNECT_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(PROBE_READ_TIMEOUT_SECS))
        .timeout(Duration::from_secs(opt.timeout_seconds))
        .user_agent(opt.user_agent.clone())
        .build()?;
    Ok(HttpTransport::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_init_logger_rejects_second_install() {
        // Installing any logger first guarantees the next attempt fails
        // with the logger-error variant instead of panicking.
        let _ = env_logger::try_init();
        let result = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        assert!(matches!(
            result,
            Err(InitializationError::LoggerError(_))
        ));
    }

    #[test]
    fn test_init_transport_from_defaults() {
        let opt = Opt::parse_from(["https_upgrade", "--url", "http://example.com/"]);
        assert!(init_transport(&opt).is_ok());
    }
}
