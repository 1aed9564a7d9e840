//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tern_core::ClassifierConfig;
use tern_framework::ClientOptions;
use tern_transport::{DEFAULT_BASE_URL, HttpTransportConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TernConfig {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Failure classification sentinels and codes.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Session persistence.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-plugin option overrides applied on commit, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, Value>,
}

// =============================================================================
// API
// =============================================================================

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint root; each method is requested at `<base_url>/<method>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API version sent as `v`.
    #[serde(default = "default_version")]
    pub version: String,

    /// Response language sent as `lang`.
    #[serde(default)]
    pub language: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Shared options readable by every plugin.
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_version(),
            language: None,
            timeout_secs: default_timeout_secs(),
            defaults: Map::new(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_version() -> String {
    "5.199".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    /// Converts to the HTTP transport settings.
    pub fn to_transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig::new(&self.base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Converts to the client facade options.
    pub fn to_client_options(&self) -> ClientOptions {
        ClientOptions {
            api_version: self.version.clone(),
            language: self.language.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether sessions are written to disk.
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// Session file. Defaults to `<data dir>/tern/session.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: default_persist(),
            path: None,
        }
    }
}

fn default_persist() -> bool {
    true
}

impl SessionConfig {
    /// Returns the session file to use, if persistence is on and a location
    /// can be determined.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if !self.persist {
            return None;
        }
        self.path.clone().or_else(|| {
            dirs::data_local_dir().map(|dir| dir.join("tern").join("session.json"))
        })
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `compact` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level.
    pub level: LogLevel,
    /// Line layout.
    pub format: LogFormat,
    /// Destination.
    pub output: LogOutput,
    /// Log file, used with `output = "file"`.
    pub file_path: Option<PathBuf>,
    /// Span lifecycle events.
    pub span_events: SpanEventConfig,
    /// Include thread ids.
    pub thread_ids: bool,
    /// Include source file and line.
    pub file_location: bool,
    /// Per-target levels, e.g. `tern_framework = "debug"`.
    pub filters: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_conversions() {
        let api = ApiConfig {
            language: Some("en".into()),
            timeout_secs: 5,
            ..ApiConfig::default()
        };
        let transport = api.to_transport_config();
        assert_eq!(transport.base_url, DEFAULT_BASE_URL);
        assert_eq!(transport.timeout(), Duration::from_secs(5));

        let options = api.to_client_options();
        assert_eq!(options.api_version, "5.199");
        assert_eq!(options.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_session_path_respects_persist_flag() {
        let config = SessionConfig {
            persist: false,
            path: Some(PathBuf::from("/tmp/session.json")),
        };
        assert_eq!(config.resolved_path(), None);

        let config = SessionConfig {
            persist: true,
            path: Some(PathBuf::from("/tmp/session.json")),
        };
        assert_eq!(config.resolved_path(), Some(PathBuf::from("/tmp/session.json")));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }
}
