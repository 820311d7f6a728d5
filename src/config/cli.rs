use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use serde::Deserialize;

use crate::domain::options::parse_assignment;

/// Command-line arguments for the synthview binary.
#[derive(Debug, Parser)]
#[command(name = "synthview", version, about = "Pluggable view rendering server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SYNTHVIEW_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve views over HTTP.
    Serve(Box<ServeArgs>),
    /// Render a single view to stdout.
    Render(RenderArgs),
}

/// Where views are resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Templates compiled into the binary.
    #[default]
    Module,
    /// Templates compiled at startup into a process-wide registry.
    Memory,
    /// Template sources stored in Postgres.
    Store,
    /// Template sources fetched from a remote content service.
    Remote,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ViewOverrides {
    /// Override the namespace views are resolved under.
    #[arg(long = "views-root", value_name = "ROOT")]
    pub root: Option<String>,

    /// Override the view backend.
    #[arg(long = "views-backend", value_enum, value_name = "KIND")]
    pub backend: Option<BackendKind>,

    /// Override the template directory loaded by the memory backend.
    #[arg(
        long = "views-memory-directory",
        value_name = "PATH",
        value_hint = ValueHint::DirPath
    )]
    pub memory_directory: Option<PathBuf>,

    /// Override the database URL used by the store backend.
    #[arg(long = "views-store-database-url", value_name = "URL")]
    pub store_database_url: Option<String>,

    /// Override the store backend pool size.
    #[arg(long = "views-store-max-connections", value_name = "COUNT")]
    pub store_max_connections: Option<u32>,

    /// Override the base URL of the remote content service.
    #[arg(long = "views-remote-base-url", value_name = "URL")]
    pub remote_base_url: Option<String>,

    /// Override the remote request timeout in milliseconds.
    #[arg(long = "views-remote-timeout-ms", value_name = "MS")]
    pub remote_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub views: ViewOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub views: ViewOverrides,

    /// Name of the view to render.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Render option as `key=value`; may be repeated.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub assignments: Vec<(String, String)>,

    /// Render options as a JSON object, applied before `--set` values.
    #[arg(long = "options-json", value_name = "JSON")]
    pub options_json: Option<String>,
}
