mod schema;

use std::fs;
use std::path::Path;

use c10_limits::{IndexLimits, LimitsError};
use c10_packet::{ChecksumPolicy, ReaderOptions};
use thiserror::Error;

pub use schema::json_schema;

/// Top-level typed configuration contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexConfig {
    pub limits: IndexLimits,
    pub reader: ReaderConfig,
    pub logging: LoggingConfig,
}

impl ReindexConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let document: schema::ReindexConfigDocument =
            serde_yaml::from_str(text).map_err(ConfigError::Parse)?;
        let config = Self::from(document);
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&schema::ReindexConfigDocument::from(self))
            .map_err(ConfigError::Serialize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        Ok(())
    }

    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        let checksum = if self.reader.verify_header_checksum {
            ChecksumPolicy::Verify
        } else {
            ChecksumPolicy::Ignore
        };
        ReaderOptions::from_limits(&self.limits, checksum)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub verify_header_checksum: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            verify_header_checksum: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error(transparent)]
    InvalidLimits(#[from] LimitsError),
}
