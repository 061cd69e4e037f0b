//! kinq Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Margin below which the top two intent scores are considered too close
pub const DEFAULT_AMBIGUITY_MARGIN: f32 = 0.3;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Query model backend
    pub model: ModelConfig,

    /// Post-processing of model output
    pub interpreter: InterpreterConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

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

        config.validate()
    }

    /// Reject values that parse but cannot work at runtime
    pub fn validate(self) -> Result<Self, ConfigError> {
        let margin = self.interpreter.ambiguity_margin;
        if !margin.is_finite() || !(0.0..=1.0).contains(&margin) {
            return Err(ConfigError::InvalidValue {
                key: "interpreter.ambiguity_margin".to_string(),
                value: margin.to_string(),
            });
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(self)
    }

    /// Load the file named by `KINQ_CONFIG` if set, then apply env overrides
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("KINQ_CONFIG") {
            Ok(path) => Self::from_file(path)?.with_env_override(),
            Err(_) => Self::from_env(),
        }
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_var("API_PORT", port)?;
        }
        if let Ok(secs) = std::env::var("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", secs)?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Model
        if let Ok(backend) = std::env::var("MODEL_BACKEND") {
            self.model.backend = backend.parse()?;
        }
        if let Ok(url) = std::env::var("MODEL_URL") {
            self.model.remote_url = url;
        }
        if let Ok(secs) = std::env::var("MODEL_TIMEOUT_SECS") {
            self.model.timeout_secs = parse_var("MODEL_TIMEOUT_SECS", secs)?;
        }

        // Interpreter
        if let Ok(margin) = std::env::var("AMBIGUITY_MARGIN") {
            self.interpreter.ambiguity_margin = parse_var("AMBIGUITY_MARGIN", margin)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        self.validate()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 10,
            cors_enabled: true,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Query model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend to load at startup
    pub backend: ModelBackend,

    /// Inference endpoint of the remote model server
    pub remote_url: String,

    /// Remote inference timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Lexicon,
            remote_url: "http://127.0.0.1:8000/parse".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Supported query model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Built-in rule based model
    Lexicon,
    /// External model server over HTTP
    Remote,
}

impl std::str::FromStr for ModelBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexicon" => Ok(Self::Lexicon),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::InvalidValue {
                key: "MODEL_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Post-processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Top-2 score gap below which a result is flagged ambiguous
    pub ambiguity_margin: f32,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
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
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
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
}

impl From<ConfigError> for crate::KinqError {
    fn from(err: ConfigError) -> Self {
        crate::KinqError::Config(err.to_string())
    }
}
