//! Application configuration loaded from TOML.
//!
//! # Responsibility
//! - Describe every tunable of the knowledge base in one serde model.
//! - Load it from an optional TOML file, falling back to defaults.
//!
//! # Invariants
//! - A missing file yields `AppConfig::default()`, never an error.
//! - Unknown keys are rejected so typos surface early.

use crate::notes::{ExportOptions, DEFAULT_TITLE};
use crate::service::entry_service::ImportOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Root configuration document.
///
/// ```toml
/// db_path = "/home/me/.local/share/promptbook/promptbook.sqlite3"
/// log_level = "info"
///
/// [import]
/// duplicate_policy = "keep_first"
/// tag_keywords = ["faces", "reflections"]
///
/// [export]
/// title = "Image prompt notes"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite database file. Callers pick a platform default when unset.
    pub db_path: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    pub log_dir: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: Option<String>,
    pub import: ImportOptions,
    pub export: ExportConfig,
}

/// `[export]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn to_options(&self) -> ExportOptions {
        ExportOptions {
            title: self.title.clone(),
        }
    }
}

/// Configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "failed to parse config `{}`: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "failed to parse config: {source}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl AppConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Loads config from `path`; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use crate::service::entry_service::DuplicatePolicy;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.import.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.export.title, "Image prompt notes");
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_toml_str(
            r#"
log_level = "warn"

[import]
duplicate_policy = "keep_first"
tag_keywords = ["faces", "reflections"]

[export]
title = "Prompt lab"
"#,
        )
        .unwrap();
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.import.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert_eq!(config.import.tag_keywords, vec!["faces", "reflections"]);
        assert_eq!(config.export.to_options().title, "Prompt lab");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
