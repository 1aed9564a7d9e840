//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Programmatic defaults ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`tern.{profile}.toml` / `tern.{profile}.yaml`)
//! 4. Main config file (`tern.toml` / `tern.yaml`)
//! 5. Environment variables (`TERN_*`)
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files
//! - `yaml-config`: enables YAML configuration files
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `TERN_` prefix with `__` as separator:
//!
//! - `TERN_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `TERN_API__TIMEOUT_SECS=60` → `api.timeout_secs = 60`
//! - `TERN_PLUGINS__CAPTCHA__ATTEMPTS=5` → `plugins.captcha.attempts = 5`
//!
//! # Example
//!
//! ```rust,ignore
//! use tern_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/tern.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::TernConfig;
use super::validation::validate_config;

/// Environment variable prefix.
const ENV_PREFIX: &str = "TERN_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `TERN_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("TERN_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic defaults.
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(config_dir) => self.search_path(config_dir.join("tern")),
            None => self,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    ///
    /// Files and environment variables still win over merged values.
    pub fn merge(mut self, config: TernConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::FileNotFound`] if an explicit file does not exist.
    /// - [`ConfigError::UnsupportedFormat`] for a file whose format feature
    ///   is disabled.
    /// - [`ConfigError::ParseError`] if the merged sources do not fit the
    ///   schema.
    /// - Any error from [`validate_config`].
    pub fn load(self) -> ConfigResult<TernConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: TernConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            base_url = %config.api.base_url,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(TernConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tern"));
        }
        paths
    }

    /// Tries `search_paths × base_names`; within a directory the profile
    /// variant is merged before the base file. Stops at the first base file.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tern.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tern.yaml", "tern.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations.
///
/// # Errors
///
/// See [`ConfigLoader::load`].
pub fn load_config() -> ConfigResult<TernConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus environment variables.
///
/// # Errors
///
/// See [`ConfigLoader::load`].
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<TernConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, TernConfig};
    use figment::Jail;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .expect("defaults load");
            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.api.version, "5.199");
            assert!(config.plugins.is_empty());
            Ok(())
        });
    }

    #[test]
    #[cfg(feature = "toml-config")]
    fn test_file_then_env_then_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tern.toml",
                r#"
                    [api]
                    base_url = "https://example.test/method"
                    timeout_secs = 10

                    [logging]
                    level = "debug"

                    [plugins.captcha]
                    attempts = 2
                    service = "local"
                "#,
            )?;
            jail.set_env("TERN_API__TIMEOUT_SECS", "20");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .expect("config loads");
            assert_eq!(config.api.base_url, "https://example.test/method");
            assert_eq!(config.api.timeout_secs, 20);
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(
                config.plugins["captcha"],
                json!({"attempts": 2, "service": "local"})
            );

            let mut overrides = TernConfig::default();
            overrides.api.language = Some("en".into());
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .merge(overrides)
                .load()
                .expect("config loads");
            assert_eq!(config.api.language.as_deref(), Some("en"));
            Ok(())
        });
    }

    #[test]
    #[cfg(feature = "toml-config")]
    fn test_profile_file_is_layered_under_base() {
        Jail::expect_with(|jail| {
            jail.create_file("tern.production.toml", "[api]\nversion = \"5.131\"\nlanguage = \"ru\"")?;
            jail.create_file("tern.toml", "[api]\nlanguage = \"en\"")?;

            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .without_env()
                .load()
                .expect("config loads");
            assert_eq!(config.api.version, "5.131");
            assert_eq!(config.api.language.as_deref(), Some("en"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("absent.toml");
            let err = ConfigLoader::new().file(&missing).load().unwrap_err();
            assert!(matches!(err, ConfigError::FileNotFound(path) if path == missing));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("tern.ini", "level = debug")?;
            let err = ConfigLoader::new()
                .file(jail.directory().join("tern.ini"))
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_env_value_is_a_parse_error() {
        Jail::expect_with(|jail| {
            jail.set_env("TERN_LOGGING__LEVEL", "loud");
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }

    #[test]
    fn test_validation_runs_on_load() {
        Jail::expect_with(|jail| {
            jail.set_env("TERN_API__TIMEOUT_SECS", "0");
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("TERN_PROFILE", "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            jail.set_env("TERN_PROFILE", "staging");
            assert_eq!(Profile::from_env(), Profile::Custom("staging".into()));
            Ok(())
        });
    }
}
