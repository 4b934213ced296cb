//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `iink` binary)
//!
//! The configuration is read-only once a recognizer is spawned.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::error::{IinkError, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Recognition server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Recognition settings
    #[serde(default)]
    pub recognition: RecognitionConfig,

    /// Trigger policy
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Canvas geometry
    #[serde(default)]
    pub view: ViewConfig,

    /// Retry and reconnect policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| IinkError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| IinkError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load the default config file (`<config dir>/iink/config.toml`) if present
    pub fn load_default() -> Result<Self> {
        match dirs::config_dir().map(|dir| dir.join("iink").join("config.toml")) {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply environment variable overrides on top of this config
    pub fn with_env(mut self) -> Self {
        if let Ok(key) = std::env::var("IINK_APPLICATION_KEY") {
            self.server.application_key = key;
        }
        if let Ok(key) = std::env::var("IINK_HMAC_KEY") {
            self.server.hmac_key = key;
        }
        if let Ok(host) = std::env::var("IINK_HOST") {
            self.server.host = host;
        }
        if let Ok(scheme) = std::env::var("IINK_SCHEME") {
            self.server.scheme = scheme;
        }
        self
    }

    /// Merge with another config (other takes precedence where it differs
    /// from defaults)
    pub fn merge(self, other: Self) -> Self {
        let defaults = ServerConfig::default();
        let pick = |ours: String, theirs: String, default: &str| {
            if theirs == default {
                ours
            } else {
                theirs
            }
        };
        Self {
            server: ServerConfig {
                scheme: pick(self.server.scheme, other.server.scheme, &defaults.scheme),
                host: pick(self.server.host, other.server.host, &defaults.host),
                application_key: pick(
                    self.server.application_key,
                    other.server.application_key,
                    &defaults.application_key,
                ),
                hmac_key: pick(self.server.hmac_key, other.server.hmac_key, &defaults.hmac_key),
            },
            recognition: other.recognition,
            triggers: other.triggers,
            view: other.view,
            retry: other.retry,
        }
    }

    /// Check the config is usable for a session
    pub fn validate(&self) -> Result<()> {
        if self.server.application_key.is_empty() {
            return Err(IinkError::Config("application key is required".to_string()));
        }
        if self.retry.max_send_attempts == 0 {
            return Err(IinkError::Config(
                "retry.max_send_attempts must be at least 1".to_string(),
            ));
        }
        if self.recognition.version == ProtocolVersion::V3 {
            if self.server.hmac_key.is_empty() {
                return Err(IinkError::Config(
                    "protocol v3 requires an HMAC key".to_string(),
                ));
            }
            if !matches!(
                self.recognition.content_type,
                ContentType::Math | ContentType::Text
            ) {
                return Err(IinkError::Config(format!(
                    "protocol v3 does not support {} recognition",
                    self.recognition.content_type
                )));
            }
        }
        Ok(())
    }

    /// WebSocket endpoint for the configured protocol version
    pub fn endpoint(&self) -> Result<Url> {
        let scheme = match self.server.scheme.as_str() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(IinkError::Config(format!("Unknown scheme: {other}")));
            },
        };
        let path = match self.recognition.version {
            ProtocolVersion::V3 => format!(
                "/api/v3.0/recognition/ws/{}",
                self.recognition.content_type.key()
            ),
            ProtocolVersion::V4 => "/api/v4.0/iink/document".to_string(),
        };
        Ok(Url::parse(&format!("{scheme}://{}{path}", self.server.host))?)
    }

    /// MIME types requested for the active content type.
    ///
    /// Empty when the export trigger is `DEMAND`: exports are requested
    /// explicitly in that case.
    pub fn requested_mime_types(&self) -> Option<Vec<String>> {
        if self.triggers.export_content == Trigger::Demand {
            None
        } else {
            Some(self.recognition.mime_types())
        }
    }
}

/// Recognition server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `https` or `http` (mapped to `wss`/`ws`)
    pub scheme: String,

    /// Server host, with optional port
    pub host: String,

    /// Application key identifying the tenant
    pub application_key: String,

    /// Secret used to answer HMAC challenges
    pub hmac_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "cloud.myscript.com".to_string(),
            application_key: String::new(),
            hmac_key: String::new(),
        }
    }
}

/// Protocol variant spoken with the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Challenge/response handshake, `start`/`continue` recognition
    V3,
    /// Content package session, iink document actions
    #[default]
    V4,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V3 => write!(f, "V3"),
            Self::V4 => write!(f, "V4"),
        }
    }
}

/// Kind of content recognized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    /// Mathematical expressions
    #[serde(rename = "MATH")]
    Math,
    /// Handwritten text
    #[default]
    #[serde(rename = "TEXT")]
    Text,
    /// Diagrams
    #[serde(rename = "DIAGRAM")]
    Diagram,
    /// Unstructured ink
    #[serde(rename = "Raw Content")]
    RawContent,
}

impl ContentType {
    /// Wire name of the content type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Math => "MATH",
            Self::Text => "TEXT",
            Self::Diagram => "DIAGRAM",
            Self::RawContent => "Raw Content",
        }
    }

    /// Lower-case key used in server profiles and endpoints
    pub fn key(&self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Text => "text",
            Self::Diagram => "diagram",
            Self::RawContent => "raw content",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Protocol variant
    pub version: ProtocolVersion,

    /// Content type
    #[serde(rename = "type")]
    pub content_type: ContentType,

    /// V3 parameters, keyed `<type>Parameter`
    pub v3: Map<String, Value>,

    /// V4 server profile, sent verbatim as the `configuration` message
    pub v4: Map<String, Value>,
}

impl RecognitionConfig {
    /// Export MIME types for the active content type
    pub fn mime_types(&self) -> Vec<String> {
        self.v4
            .get(self.content_type.key())
            .and_then(|profile| profile.get("mimeTypes"))
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// V3 `start` parameters for the active content type
    pub fn v3_parameters(&self) -> Value {
        self.v3
            .get(&format!("{}Parameter", self.content_type.key()))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        let v3 = json!({
            "mathParameter": {
                "resultTypes": ["LATEX", "MATHML"],
                "columnarOperation": false,
                "userResources": [],
                "scratchOut": true,
                "nbMaxSymbols": 0
            },
            "textParameter": {
                "language": "en_US",
                "textInputMode": "CURSIVE",
                "resultDetail": "TEXT",
                "contentTypes": []
            }
        });
        let v4 = json!({
            "lang": "en_US",
            "export": { "jiix": { "strokes": false } },
            "math": { "mimeTypes": ["application/x-latex", "application/mathml+xml"] },
            "text": { "mimeTypes": ["text/plain", "application/vnd.myscript.jiix"] },
            "diagram": { "mimeTypes": ["application/vnd.myscript.jiix"] },
            "raw content": { "mimeTypes": ["application/vnd.myscript.jiix"] }
        });
        Self {
            version: ProtocolVersion::default(),
            content_type: ContentType::default(),
            v3: into_map(v3),
            v4: into_map(v4),
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// When an action is triggered by the editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    /// On every pointer up
    #[default]
    PointerUp,
    /// After a quiet period
    QuietPeriod,
    /// Only when explicitly requested
    Demand,
}

/// Trigger policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Export trigger
    pub export_content: Trigger,
    /// Stroke batch trigger
    pub add_strokes: Trigger,
}

/// Canvas geometry sent on session establishment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Canvas DPI (both axes)
    pub dpi: u32,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            dpi: 96,
            width: 800,
            height: 600,
        }
    }
}

/// Retry and reconnect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per action before the send error is surfaced
    pub max_send_attempts: u32,

    /// Reconnects allowed after a handshake failure
    pub max_reconnect_attempts: u32,

    /// First retry delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Retry delay ceiling in milliseconds
    pub max_backoff_ms: u64,

    /// Handshake deadline in milliseconds
    pub handshake_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: 3,
            max_reconnect_attempts: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            handshake_timeout_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Handshake deadline
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}
