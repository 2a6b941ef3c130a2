use c10_limits::IndexLimits;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{LogFormat, LogLevel, LoggingConfig, ReaderConfig, ReindexConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReindexConfigDocument {
    #[serde(default)]
    pub limits: LimitsDocument,
    #[serde(default)]
    pub reader: ReaderConfigDocument,
    #[serde(default)]
    pub logging: LoggingConfigDocument,
}

impl From<&ReindexConfig> for ReindexConfigDocument {
    fn from(value: &ReindexConfig) -> Self {
        Self {
            limits: LimitsDocument::from(&value.limits),
            reader: ReaderConfigDocument::from(&value.reader),
            logging: LoggingConfigDocument::from(&value.logging),
        }
    }
}

impl From<ReindexConfigDocument> for ReindexConfig {
    fn from(value: ReindexConfigDocument) -> Self {
        Self {
            limits: value.limits.into(),
            reader: value.reader.into(),
            logging: value.logging.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct LimitsDocument {
    #[serde(default = "default_max_index_packet_bytes")]
    pub max_index_packet_bytes: usize,
    #[serde(default = "default_max_source_packet_bytes")]
    pub max_source_packet_bytes: usize,
}

impl Default for LimitsDocument {
    fn default() -> Self {
        Self::from(&IndexLimits::default())
    }
}

impl From<&IndexLimits> for LimitsDocument {
    fn from(value: &IndexLimits) -> Self {
        Self {
            max_index_packet_bytes: value.max_index_packet_bytes,
            max_source_packet_bytes: value.max_source_packet_bytes,
        }
    }
}

impl From<LimitsDocument> for IndexLimits {
    fn from(value: LimitsDocument) -> Self {
        Self {
            max_index_packet_bytes: value.max_index_packet_bytes,
            max_source_packet_bytes: value.max_source_packet_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReaderConfigDocument {
    #[serde(default = "default_verify_header_checksum")]
    pub verify_header_checksum: bool,
}

impl Default for ReaderConfigDocument {
    fn default() -> Self {
        Self::from(&ReaderConfig::default())
    }
}

impl From<&ReaderConfig> for ReaderConfigDocument {
    fn from(value: &ReaderConfig) -> Self {
        Self {
            verify_header_checksum: value.verify_header_checksum,
        }
    }
}

impl From<ReaderConfigDocument> for ReaderConfig {
    fn from(value: ReaderConfigDocument) -> Self {
        Self {
            verify_header_checksum: value.verify_header_checksum,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoggingConfigDocument {
    #[serde(default)]
    pub level: LogLevelDocument,
    #[serde(default)]
    pub format: LogFormatDocument,
}

impl From<&LoggingConfig> for LoggingConfigDocument {
    fn from(value: &LoggingConfig) -> Self {
        Self {
            level: LogLevelDocument::from(value.level),
            format: LogFormatDocument::from(value.format),
        }
    }
}

impl From<LoggingConfigDocument> for LoggingConfig {
    fn from(value: LoggingConfigDocument) -> Self {
        Self {
            level: value.level.into(),
            format: value.format.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LogLevelDocument {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LogLevelDocument {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

impl From<LogLevelDocument> for LogLevel {
    fn from(value: LogLevelDocument) -> Self {
        match value {
            LogLevelDocument::Trace => Self::Trace,
            LogLevelDocument::Debug => Self::Debug,
            LogLevelDocument::Info => Self::Info,
            LogLevelDocument::Warn => Self::Warn,
            LogLevelDocument::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LogFormatDocument {
    Json,
    Pretty,
    #[default]
    Compact,
}

impl From<LogFormat> for LogFormatDocument {
    fn from(value: LogFormat) -> Self {
        match value {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

impl From<LogFormatDocument> for LogFormat {
    fn from(value: LogFormatDocument) -> Self {
        match value {
            LogFormatDocument::Json => Self::Json,
            LogFormatDocument::Pretty => Self::Pretty,
            LogFormatDocument::Compact => Self::Compact,
        }
    }
}

pub fn json_schema() -> JsonValue {
    serde_json::to_value(schema_for!(ReindexConfigDocument)).unwrap_or(JsonValue::Null)
}

fn default_max_index_packet_bytes() -> usize {
    IndexLimits::DEFAULT_MAX_INDEX_PACKET_BYTES
}

fn default_max_source_packet_bytes() -> usize {
    IndexLimits::DEFAULT_MAX_SOURCE_PACKET_BYTES
}

fn default_verify_header_checksum() -> bool {
    true
}
