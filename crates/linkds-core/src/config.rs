//! linkds Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with defaults matching the usual corpus layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main builder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuilderConfig {
    /// Input table and stream settings
    pub input: InputConfig,

    /// Artifact output settings
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl BuilderConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(size) = std::env::var("LINKDS_CHUNK_SIZE") {
            self.input.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LINKDS_CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }
        if let Ok(dir) = std::env::var("LINKDS_OUTPUT_DIR") {
            self.output.default_dir = PathBuf::from(dir);
        }
        if let Ok(format) = std::env::var("LINKDS_FORMAT") {
            self.output.format = format.parse()?;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check values that parse but cannot drive a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "input.chunk_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.input.allow_columns.is_empty() {
            return Err(ConfigError::MissingRequired(
                "input.allow_columns".to_string(),
            ));
        }
        if self.input.page_entity_column.is_empty() {
            return Err(ConfigError::MissingRequired(
                "input.page_entity_column".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Columns of the filtered-items table merged into the allow-set
    pub allow_columns: Vec<String>,

    /// Page map column holding the entity id
    pub page_entity_column: String,

    /// Annotation records per chunk
    pub chunk_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            allow_columns: vec!["qid".to_string(), "Work_of_art".to_string()],
            page_entity_column: "item_id".to_string(),
            chunk_size: 1000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for timestamped artifacts when no output directory is given
    pub default_dir: PathBuf,

    /// Artifact encoding
    pub format: ArtifactFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("data/dataset"),
            format: ArtifactFormat::Bincode,
        }
    }
}

/// Supported artifact encodings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    #[default]
    Bincode,
    Json,
}

impl ArtifactFormat {
    /// File extension used for artifacts of this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Bincode => "pkl",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ArtifactFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bincode" => Ok(Self::Bincode),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LINKDS_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bincode => write!(f, "bincode"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
