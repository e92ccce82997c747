//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Runtime flags have environment variable equivalents
//! for service-manager deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "adsb-relay",
    version,
    about = "Filter dump1090 output and fan it out to TCP consumers",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        adsb-relay init                          Create a starter config\n  \
        adsb-relay run                           Start with ./adsb_server_config.conf\n  \
        adsb-relay run -c /etc/adsb/relay.conf   Start with a specific config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        adsb-relay run                                  Default config file\n  \
        adsb-relay run -c relay.conf --pretty           Local dev mode\n  \
        adsb-relay run --status-port 9100               Expose GET /health")]
pub struct RunArgs {
    /// Config file path (INI); created with defaults when missing
    #[arg(short, long, env = "ADSB_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    /// Also append plain-text logs to this file
    #[arg(long, env = "ADSB_RELAY_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    // -- Status --
    /// Serve GET /health on this port
    #[arg(long, env = "STATUS_PORT", help_heading = "Status")]
    pub status_port: Option<u16>,

    /// Status endpoint listen address
    #[arg(
        long,
        env = "STATUS_HOST",
        default_value = "127.0.0.1",
        help_heading = "Status"
    )]
    pub status_host: String,
}

#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "adsb_server_config.conf")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,

    /// Fail when any key fell back to its default
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance's status endpoint
    #[arg(default_value = "http://127.0.0.1:9100")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
