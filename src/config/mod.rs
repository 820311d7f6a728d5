//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

#[cfg(test)]
mod tests;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{BackendKind, CliArgs, Command, RenderArgs, ServeArgs, ServeOverrides, ViewOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "synthview";
const ENV_PREFIX: &str = "SYNTHVIEW";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub views: ViewSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Namespace handed to the backend with every lookup.
    pub root: Option<String>,
    pub backend: BackendSettings,
}

#[derive(Debug, Clone)]
pub enum BackendSettings {
    Module,
    Memory {
        directory: PathBuf,
    },
    Store {
        database_url: String,
        max_connections: NonZeroU32,
    },
    Remote {
        base_url: Url,
        timeout: Duration,
    },
}

impl BackendSettings {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSettings::Module => BackendKind::Module,
            BackendSettings::Memory { .. } => BackendKind::Memory,
            BackendSettings::Store { .. } => BackendKind::Store,
            BackendSettings::Remote { .. } => BackendKind::Remote,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_view_overrides(&args.views),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    views: RawViewSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_view_overrides(&overrides.views);
    }

    fn apply_view_overrides(&mut self, overrides: &ViewOverrides) {
        if let Some(root) = overrides.root.as_ref() {
            self.views.root = Some(root.clone());
        }
        if let Some(backend) = overrides.backend {
            self.views.backend = Some(backend);
        }
        if let Some(directory) = overrides.memory_directory.as_ref() {
            self.views.memory.directory = Some(directory.clone());
        }
        if let Some(url) = overrides.store_database_url.as_ref() {
            self.views.store.database_url = Some(url.clone());
        }
        if let Some(max) = overrides.store_max_connections {
            self.views.store.max_connections = Some(max);
        }
        if let Some(url) = overrides.remote_base_url.as_ref() {
            self.views.remote.base_url = Some(url.clone());
        }
        if let Some(timeout) = overrides.remote_timeout_ms {
            self.views.remote.timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            views,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let views = build_view_settings(views)?;

        Ok(Self {
            server,
            logging,
            views,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_view_settings(views: RawViewSettings) -> Result<ViewSettings, LoadError> {
    let root = non_empty(views.root).map(|root| root.trim_matches('/').to_string());
    let root = root.filter(|root| !root.is_empty());

    let backend = match views.backend.unwrap_or_default() {
        BackendKind::Module => BackendSettings::Module,
        BackendKind::Memory => {
            let directory = views.memory.directory.ok_or_else(|| {
                LoadError::invalid(
                    "views.memory.directory",
                    "required when views.backend is `memory`",
                )
            })?;
            if directory.as_os_str().is_empty() {
                return Err(LoadError::invalid(
                    "views.memory.directory",
                    "path must not be empty",
                ));
            }
            BackendSettings::Memory { directory }
        }
        BackendKind::Store => {
            let database_url = non_empty(views.store.database_url).ok_or_else(|| {
                LoadError::invalid(
                    "views.store.database_url",
                    "required when views.backend is `store`",
                )
            })?;
            let max_connections = views
                .store
                .max_connections
                .unwrap_or(DEFAULT_STORE_MAX_CONNECTIONS);
            BackendSettings::Store {
                database_url,
                max_connections: non_zero_u32(
                    max_connections.into(),
                    "views.store.max_connections",
                )?,
            }
        }
        BackendKind::Remote => {
            let raw_url = non_empty(views.remote.base_url).ok_or_else(|| {
                LoadError::invalid(
                    "views.remote.base_url",
                    "required when views.backend is `remote`",
                )
            })?;
            let base_url = parse_base_url(&raw_url)?;
            let timeout_ms = views
                .remote
                .timeout_ms
                .unwrap_or(DEFAULT_REMOTE_TIMEOUT_MS);
            let timeout_ms = NonZeroU64::new(timeout_ms).ok_or_else(|| {
                LoadError::invalid("views.remote.timeout_ms", "must be greater than zero")
            })?;
            BackendSettings::Remote {
                base_url,
                timeout: Duration::from_millis(timeout_ms.get()),
            }
        }
    };

    Ok(ViewSettings { root, backend })
}

fn parse_base_url(raw: &str) -> Result<Url, LoadError> {
    let mut url = Url::parse(raw)
        .map_err(|err| LoadError::invalid("views.remote.base_url", format!("`{raw}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "views.remote.base_url",
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewSettings {
    root: Option<String>,
    backend: Option<BackendKind>,
    memory: RawMemorySettings,
    store: RawStoreSettings,
    remote: RawRemoteSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMemorySettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    database_url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRemoteSettings {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
