use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_ENV: &str = "PORTER_CONFIG";

/// Top-level server configuration.
///
/// Every section falls back to its defaults, so an empty YAML document is a
/// valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub sessions: SessionConfig,
    pub cgi: CgiConfig,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    /// `None` waits forever for the client.
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: String,
    pub index: String,
    pub default_mime: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub capacity: usize,
    pub cookie_name: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CgiConfig {
    /// File name suffixes allowed to run on POST.
    pub extensions: Vec<String>,
    pub timeout_secs: Option<u64>,
    /// Output held back before the handler switches to streaming.
    pub buffer_limit: usize,
    pub content_type: String,
}

/// Maximum level for the fmt subscriber, e.g. `info` or `debug`.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 32,
            read_timeout_secs: Some(30),
            write_timeout_secs: Some(30),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: "www".to_string(),
            index: "index.html".to_string(),
            default_mime: "application/octet-stream".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            cookie_name: "sessionId".to_string(),
            endpoint: "/session".to_string(),
        }
    }
}

impl Default for CgiConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".cgi".to_string()],
            timeout_secs: Some(30),
            buffer_limit: 64 * 1024,
            content_type: "text/plain".to_string(),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl LogLevel {
    /// Parses the configured level, falling back to `INFO` on garbage.
    pub fn as_level(&self) -> tracing::Level {
        self.0.parse().unwrap_or(tracing::Level::INFO)
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_secs.map(Duration::from_secs)
    }
}

impl CgiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Loads the file named by `PORTER_CONFIG`, or the defaults when unset.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        // serde_yaml rejects an empty document outright
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Parses the positional port argument.
///
/// Returns `None` for anything that is not a decimal port in `1..=65535`.
pub fn parse_port(arg: &str) -> Option<u16> {
    match arg.trim().parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}
