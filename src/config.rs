//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSALVAGE_CONFIG` (environment variable)
//! 2. `~/.config/mailsalvage/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsalvage\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags override whatever the file says.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `User-Agent` stamped on every rebuilt message.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:45.0) Gecko/20100101 Thunderbird/45.4.0";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where and how `.eml` files are laid out.
    pub output: OutputConfig,
    /// How unresolvable messages and disk writes are handled.
    pub recovery: RecoveryConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Output layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory that receives the folder tree.
    pub root: PathBuf,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Drop the host segment of folder URIs (`user/host/path` becomes `user/path`).
    pub strip_host: bool,
}

/// Recovery behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// What to do when a message references data missing from the export.
    pub policy: ResolutionPolicy,
    /// Upper bound on files held open by background writes.
    pub max_open_files: usize,
}

/// Reaction to a [`ResolutionError`](crate::error::ResolutionError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// Abort the whole run on the first unresolvable message.
    #[default]
    FailFast,
    /// Log the message, leave it out of the output and keep going.
    Skip,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strip_host: false,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::FailFast,
            max_open_files: 64,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match parse_config(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> crate::error::Result<Config> {
    let cfg: Config = toml::from_str(contents)
        .map_err(|e| crate::error::SalvageError::Config(e.to_string()))?;
    if cfg.recovery.max_open_files == 0 {
        return Err(crate::error::SalvageError::Config(
            "recovery.max_open_files must be at least 1".to_string(),
        ));
    }
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSALVAGE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailsalvage").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsalvage")
}
