//! Configuration for logger registration, redaction and diagnostics

use crate::error::{LumenError, Result};
use crate::severity::Severity;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mask written in place of redacted values
pub const DEFAULT_MASK: &str = "XXXXXXXXXXXXX";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    /// Global enable/disable toggle
    pub enabled: bool,

    /// Minimum severities
    pub log_level: LogLevelConfig,

    /// Redaction of sensitive header values
    pub redaction: RedactionConfig,

    /// Internal diagnostics output
    pub diagnostics: DiagnosticsConfig,
}

/// Minimum severity per category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogLevelConfig {
    /// Level applied when no category prefix matches. `None` disables all.
    pub default: String,

    /// Category prefix to level; the longest matching prefix wins
    pub categories: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Replacement used by rules without their own mask
    pub mask: String,

    /// Rules added to the built-in `Authorization` rule
    pub rules: Vec<RedactionRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionRuleConfig {
    pub header: String,

    #[serde(default)]
    pub matcher: MatchKind,

    #[serde(default)]
    pub mask: Option<String>,
}

/// How a redaction rule compares header names (ASCII case-insensitive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    #[default]
    Equals,
    StartsWith,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// `tracing` filter directive for internal diagnostics
    pub level: String,

    pub format: DiagnosticsFormat,

    pub console_enabled: bool,
}

/// Diagnostics output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsFormat {
    /// Structured JSON format
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

impl Default for LumenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: LogLevelConfig::default(),
            redaction: RedactionConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl Default for LogLevelConfig {
    fn default() -> Self {
        Self {
            default: Severity::Information.to_string(),
            categories: BTreeMap::new(),
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            mask: DEFAULT_MASK.to_string(),
            rules: Vec::new(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: DiagnosticsFormat::Compact,
            console_enabled: true,
        }
    }
}

/// Parse a configured level; `None` means nothing is enabled.
///
/// Unknown names fall back to `Information`.
pub fn parse_level(raw: &str) -> Option<Severity> {
    if raw.trim().eq_ignore_ascii_case("none") {
        return None;
    }
    match raw.parse() {
        Ok(severity) => Some(severity),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Unknown log level, using Information");
            Some(Severity::Information)
        }
    }
}

impl LumenConfig {
    /// Load configuration from file or create default
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_file.exists() {
            let content = tokio::fs::read_to_string(&config_file).await?;
            toml::from_str(&content).map_err(|e| LumenError::Config {
                message: format!("Failed to parse config '{}': {}", config_file.display(), e),
            })?
        } else {
            Self::default()
        };

        config.load_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| LumenError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        tokio::fs::write(&config_file, content).await?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("LUMEN_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(self.enabled);
        }

        if let Ok(level) = std::env::var("LUMEN_LOG_LEVEL") {
            self.log_level.default = level;
        }

        if let Ok(mask) = std::env::var("LUMEN_REDACTION_MASK") {
            self.redaction.mask = mask;
        }

        if let Ok(format) = std::env::var("LUMEN_DIAGNOSTICS_FORMAT") {
            self.diagnostics.format = match format.to_lowercase().as_str() {
                "json" => DiagnosticsFormat::Json,
                "pretty" => DiagnosticsFormat::Pretty,
                "compact" => DiagnosticsFormat::Compact,
                _ => self.diagnostics.format,
            };
        }
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "lumen", "lumen").ok_or_else(|| LumenError::Config {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(project_dirs.config_dir().join("lumen.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.redaction.mask.is_empty() {
            return Err(LumenError::Config {
                message: "redaction mask must not be empty".to_string(),
            });
        }

        for rule in &self.redaction.rules {
            if rule.header.trim().is_empty() {
                return Err(LumenError::Config {
                    message: "redaction rule header must not be empty".to_string(),
                });
            }
        }

        if self.diagnostics.level.trim().is_empty() {
            return Err(LumenError::Config {
                message: "diagnostics level must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
