use std::path::PathBuf;

use clap::{Parser, ValueEnum};

// constants (used as defaults)

/// Status code used for synthesized rewrite redirects.
pub const REDIRECT_STATUS: u16 = 302;

// Network operation timeouts
/// TCP connection timeout for probe and regular requests, in seconds
pub const PROBE_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Read timeout for probe and regular requests, in seconds
pub const PROBE_READ_TIMEOUT_SECS: u64 = 5;

// Probe bounds
/// Maximum number of redirect hops the upgrade probe will follow
/// Prevents a misbehaving server from looping the probe indefinitely
pub const MAX_PROBE_HOPS: usize = 10;

// Retry strategy
/// Initial delay in milliseconds before first retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 1000;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 20;
/// Maximum number of send attempts for connection-class failures
pub const RETRY_MAX_ATTEMPTS: usize = 3;

/// Default User-Agent string for HTTP requests.
///
/// Uses a generic Chrome-like string without a specific version number to avoid
/// becoming outdated. Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Informational output (default)
    Info,
    /// Debug output, including probe steps
    Debug,
    /// Everything
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored
    Plain,
    /// One JSON object per line
    Json,
}

/// Which adapter chain to put in front of the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Pin every URL to https (excluded hosts to http), no probing
    Force,
    /// Probe the destination over http before upgrading
    Prefer,
    /// Force https, fall back to http on categorized transport failures
    Upgrade,
    /// Like `upgrade`, with an extra guard against rewrite loops
    SafeUpgrade,
    /// Rewrite via preload list and ruleset only
    Rewrite,
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
/// All options have sensible defaults and can be overridden via command-line flags.
///
/// # Examples
///
/// ```bash
/// # Check a file of URLs with the probing chain
/// https_upgrade urls.txt
///
/// # Check a single URL with plain forced https, excluding one API host
/// https_upgrade --url http://example.com/ --mode force --exclude example.com/api
///
/// # Rewrite-only mode with a ruleset and preload list
/// https_upgrade urls.txt --mode rewrite --rules rules.json --preload preload.txt
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "https_upgrade",
    about = "Checks URLs through scheme-rewriting adapters and reports the decisions."
)]
pub struct Opt {
    /// File of URLs to read ("-" for stdin); may be omitted when --url is given
    #[arg(value_parser)]
    pub file: Option<PathBuf>,

    /// Individual URL to check (repeatable)
    #[arg(long = "url")]
    pub urls: Vec<String>,

    /// Adapter chain: force|prefer|upgrade|safe-upgrade|rewrite
    #[arg(long, value_enum, default_value_t = Mode::Prefer)]
    pub mode: Mode,

    /// JSON ruleset file mapping hosts to rewrite rules (rewrite mode)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Preload domain list, one domain per line (rewrite mode)
    #[arg(long)]
    pub preload: Option<PathBuf>,

    /// Scheme-stripped URL prefix excluded from forced https (repeatable)
    ///
    /// Matching is exact-prefix and case-sensitive, e.g. `example.com/api`
    /// pins `http://example.com/api/...` to http.
    #[arg(long = "exclude")]
    pub exclusions: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}
