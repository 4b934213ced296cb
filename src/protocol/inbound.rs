//! Inbound server messages.
//!
//! Every text frame is parsed into a closed [`ServerMessage`] sum type. Types
//! the active protocol version does not know become
//! [`ServerMessage::Unrecognized`] rather than falling through silently.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::ProtocolVersion;
use crate::error::Result;

/// Kind of a variant A recognition result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionKind {
    /// `mathResult`
    Math,
    /// `textResult`
    Text,
}

/// Server-to-client message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Nonce to answer with a keyed hash
    HmacChallenge {
        /// Challenge value
        challenge: String,
    },
    /// Variant A handshake completed
    Init,
    /// Reset acknowledged
    Reset,
    /// Variant A recognition result
    Recognition {
        /// Result kind
        kind: RecognitionKind,
        /// Server recognition instance
        instance_id: Option<String>,
        /// Raw result data
        data: Value,
    },
    /// Variant B session identifier
    SessionDescription {
        /// Identifier usable with `restoreIInkSession`
        session_id: String,
    },
    /// Variant B content package opened
    ContentPackageDescription {
        /// Parts in the package
        part_count: Option<u64>,
    },
    /// Render-only traffic (`svgPatch`)
    Render,
    /// Variant B action result
    Result(ResultPayload),
    /// Error reported by the server
    Error {
        /// Error code
        code: Option<String>,
        /// Error message
        message: String,
    },
    /// Type not known to the active protocol version
    Unrecognized {
        /// Wire `type`
        kind: String,
        /// Raw message
        raw: Value,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

impl ServerMessage {
    /// Parse a text frame for the given protocol version
    pub fn parse(text: &str, version: ProtocolVersion) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        let Envelope { kind } = Envelope::deserialize(&raw)?;
        Ok(match version {
            ProtocolVersion::V3 => Self::parse_v3(kind, raw),
            ProtocolVersion::V4 => Self::parse_v4(kind, raw),
        })
    }

    fn parse_v3(kind: String, raw: Value) -> Self {
        match kind.as_str() {
            "hmacChallenge" => match str_field(&raw["data"], "challenge") {
                Some(challenge) => Self::HmacChallenge { challenge },
                None => Self::Unrecognized { kind, raw },
            },
            "init" => Self::Init,
            "reset" => Self::Reset,
            "mathResult" | "textResult" => {
                let data = raw.get("data").cloned().unwrap_or(Value::Null);
                Self::Recognition {
                    kind: if kind == "mathResult" {
                        RecognitionKind::Math
                    } else {
                        RecognitionKind::Text
                    },
                    instance_id: str_field(&data, "instanceId"),
                    data,
                }
            },
            "error" => Self::error(&raw),
            _ => Self::Unrecognized { kind, raw },
        }
    }

    fn parse_v4(kind: String, raw: Value) -> Self {
        match kind.as_str() {
            "sessionDescription" => match str_field(&raw, "iinkSessionId") {
                Some(session_id) => Self::SessionDescription { session_id },
                None => Self::Unrecognized { kind, raw },
            },
            "contentPackageDescription" => Self::ContentPackageDescription {
                part_count: raw.get("contentPartCount").and_then(Value::as_u64),
            },
            "svgPatch" => Self::Render,
            "error" => Self::error(&raw),
            "partChanged" | "contentChanged" | "exported" | "idle" => {
                Self::Result(ResultPayload::new(kind, raw))
            },
            _ => {
                let payload = ResultPayload::new(kind, raw);
                if payload.is_result() {
                    Self::Result(payload)
                } else {
                    Self::Unrecognized {
                        kind: payload.kind,
                        raw: payload.raw,
                    }
                }
            },
        }
    }

    fn error(raw: &Value) -> Self {
        // variant A nests the details under `data`
        let source = if raw.get("data").is_some_and(Value::is_object) {
            &raw["data"]
        } else {
            raw
        };
        Self::Error {
            code: str_field(source, "code"),
            message: str_field(source, "message").unwrap_or_else(|| "unknown error".to_string()),
        }
    }

    /// Wire `type` of the message
    pub fn kind(&self) -> &str {
        match self {
            Self::HmacChallenge { .. } => "hmacChallenge",
            Self::Init => "init",
            Self::Reset => "reset",
            Self::Recognition {
                kind: RecognitionKind::Math,
                ..
            } => "mathResult",
            Self::Recognition {
                kind: RecognitionKind::Text,
                ..
            } => "textResult",
            Self::SessionDescription { .. } => "sessionDescription",
            Self::ContentPackageDescription { .. } => "contentPackageDescription",
            Self::Render => "svgPatch",
            Self::Result(payload) => &payload.kind,
            Self::Error { .. } => "error",
            Self::Unrecognized { kind, .. } => kind,
        }
    }
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Variant B result payload
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPayload {
    /// Wire `type`
    pub kind: String,
    /// Whole message
    pub raw: Value,
}

impl ResultPayload {
    /// Wrap a raw result
    pub fn new(kind: impl Into<String>, raw: Value) -> Self {
        Self {
            kind: kind.into(),
            raw,
        }
    }

    /// Whether the payload carries any result field
    pub fn is_result(&self) -> bool {
        self.updates().is_some()
            || self.exports().is_some()
            || self.can_undo().is_some()
            || self.can_redo().is_some()
    }

    /// Incremental recognized symbols
    pub fn updates(&self) -> Option<&Vec<Value>> {
        self.raw.get("updates").and_then(Value::as_array)
    }

    /// Exports keyed by MIME type
    pub fn exports(&self) -> Option<&Map<String, Value>> {
        self.raw.get("exports").and_then(Value::as_object)
    }

    /// Undo availability
    pub fn can_undo(&self) -> Option<bool> {
        self.raw.get("canUndo").and_then(Value::as_bool)
    }

    /// Redo availability
    pub fn can_redo(&self) -> Option<bool> {
        self.raw.get("canRedo").and_then(Value::as_bool)
    }

    /// Whether the active part changed
    pub fn is_part_change(&self) -> bool {
        self.kind == "partChanged"
    }

    /// Identifier of the new active part
    pub fn part_id(&self) -> Option<&str> {
        self.raw.get("partId").and_then(Value::as_str)
    }
}
