//! Pipeline configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) is a
//! valid configuration. Command-line flags are layered on top by the caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::chain::DEFAULT_TARGET;
use crate::data::normalize::MalformedPolicy;
use crate::data::writer::DEFAULT_OUTPUT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one consolidate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the data tree.
    pub data_dir: PathBuf,
    /// Consolidated output file.
    pub output: PathBuf,
    /// Dataset (file stem) chained from every group.
    pub target: String,
    /// Extension of files picked up by the indexer.
    pub extension: String,
    /// Field delimiter; must be a single ASCII character.
    pub delimiter: char,
    pub on_malformed: MalformedPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            output: PathBuf::from(DEFAULT_OUTPUT),
            target: DEFAULT_TARGET.to_string(),
            extension: "csv".to_string(),
            delimiter: ',',
            on_malformed: MalformedPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "delimiter '{}' is not an ASCII character",
                self.delimiter
            )));
        }
        if self.target.is_empty() {
            return Err(ConfigError::Invalid("target dataset name is empty".into()));
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "extension '{}' must be non-empty and given without a leading dot",
                self.extension
            )));
        }
        Ok(())
    }

    /// Delimiter as a byte. Non-ASCII values are rejected by `validate`.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.output, PathBuf::from("all.csv"));
        assert_eq!(config.target, "prices");
        assert_eq!(config.extension, "csv");
        assert_eq!(config.delimiter_byte(), b',');
        assert_eq!(config.on_malformed, MalformedPolicy::Truncate);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = PipelineConfig::from_toml(
            r#"
            data_dir = "/srv/quotes"
            target = "etf"
            delimiter = ";"
            on_malformed = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/quotes"));
        assert_eq!(config.target, "etf");
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.on_malformed, MalformedPolicy::Skip);
        assert_eq!(config.output, PathBuf::from("all.csv"));
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = PipelineConfig::from_toml(r#"on_malformed = "ignore""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_ascii_delimiter() {
        let err = PipelineConfig::from_toml(r#"delimiter = "§""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_dotted_extension() {
        let err = PipelineConfig::from_toml(r#"extension = ".csv""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = PipelineConfig::from_file(Path::new("/no/such/stockseries.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
