//! Outbound wire messages.
//!
//! Every request is a JSON object whose `type` field names the operation.
//! Field names and casing are part of the server contract.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::{PointerType, Stroke};

/// Client-to-server message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    // ── Variant A handshake ─────────────────────────────────────────────
    /// Announce the application key
    ApplicationKey {
        /// Application key
        application_key: String,
    },
    /// Answer to an HMAC challenge
    Hmac {
        /// Application key
        application_key: String,
        /// Challenge being answered
        challenge: String,
        /// Keyed hash of the challenge
        hmac: String,
    },

    // ── Variant A recognition ───────────────────────────────────────────
    /// First stroke batch of a recognition instance
    Start {
        /// Recognition parameters
        parameters: Value,
        /// Stroke components
        components: Vec<Component>,
    },
    /// Subsequent stroke batch
    Continue {
        /// Stroke components
        components: Vec<Component>,
    },
    /// Drop the server-side recognition instance content
    Reset,

    // ── Variant B session ───────────────────────────────────────────────
    /// Open a fresh content package
    NewContentPackage {
        /// Application key
        application_key: String,
        /// Horizontal DPI
        x_dpi: u32,
        /// Vertical DPI
        y_dpi: u32,
        /// Canvas height
        view_size_height: u32,
        /// Canvas width
        view_size_width: u32,
    },
    /// Resume a previous session
    #[serde(rename = "restoreIInkSession")]
    RestoreIInkSession {
        /// Session to restore
        iink_session_id: String,
        /// Application key
        application_key: String,
        /// Horizontal DPI
        x_dpi: u32,
        /// Vertical DPI
        y_dpi: u32,
        /// Canvas height
        view_size_height: u32,
        /// Canvas width
        view_size_width: u32,
    },

    // ── Variant B actions ───────────────────────────────────────────────
    /// Create a content part
    NewContentPart {
        /// Content type wire name
        content_type: String,
        /// Exports to push with results
        #[serde(skip_serializing_if = "Option::is_none")]
        mime_types: Option<Vec<String>>,
    },
    /// Open an existing content part
    OpenContentPart {
        /// Part identifier
        id: String,
        /// Exports to push with results
        #[serde(skip_serializing_if = "Option::is_none")]
        mime_types: Option<Vec<String>>,
    },
    /// Server profile
    Configuration {
        /// Profile fields, inlined
        #[serde(flatten)]
        profile: Map<String, Value>,
    },
    /// Stroke batch
    AddStrokes {
        /// New strokes
        strokes: Vec<StrokePayload>,
    },
    /// Undo
    Undo,
    /// Redo
    Redo,
    /// Clear the part
    Clear,
    /// Convert ink to typeset
    Convert,
    /// Zoom the view
    Zoom {
        /// Zoom value
        zoom: f64,
    },
    /// Canvas resized
    ChangeViewSize {
        /// Canvas height
        height: u32,
        /// Canvas width
        width: u32,
    },
    /// Request exports
    Export {
        /// Part identifier
        #[serde(skip_serializing_if = "Option::is_none")]
        part_id: Option<String>,
        /// Requested MIME types
        mime_types: Vec<String>,
    },
    /// Import content into the part
    Import {
        /// Part identifier
        #[serde(skip_serializing_if = "Option::is_none")]
        part_id: Option<String>,
        /// MIME type of `data`
        #[serde(rename = "mimetype")]
        mimetype: String,
        /// Content to import
        data: String,
    },
    /// Resolve once the server is idle
    WaitForIdle,
    /// Pen style as an inline style string
    SetPenStyle {
        /// Inline style, empty when unset
        style: String,
    },
    /// Theme stylesheet
    SetTheme {
        /// Serialized stylesheet
        theme: String,
    },
}

impl Request {
    /// Wire `type` of the request
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApplicationKey { .. } => "applicationKey",
            Self::Hmac { .. } => "hmac",
            Self::Start { .. } => "start",
            Self::Continue { .. } => "continue",
            Self::Reset => "reset",
            Self::NewContentPackage { .. } => "newContentPackage",
            Self::RestoreIInkSession { .. } => "restoreIInkSession",
            Self::NewContentPart { .. } => "newContentPart",
            Self::OpenContentPart { .. } => "openContentPart",
            Self::Configuration { .. } => "configuration",
            Self::AddStrokes { .. } => "addStrokes",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::Convert => "convert",
            Self::Zoom { .. } => "zoom",
            Self::ChangeViewSize { .. } => "changeViewSize",
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
            Self::WaitForIdle => "waitForIdle",
            Self::SetPenStyle { .. } => "setPenStyle",
            Self::SetTheme { .. } => "setTheme",
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Stroke as sent in `addStrokes`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokePayload {
    /// Stroke identifier
    pub id: String,
    /// Pointer device
    pub pointer_type: PointerType,
    /// Pointer identifier
    pub pointer_id: i64,
    /// X coordinates
    pub x: Vec<f64>,
    /// Y coordinates
    pub y: Vec<f64>,
    /// Timestamps
    pub t: Vec<u64>,
    /// Pressures
    pub p: Vec<f64>,
}

impl From<&Stroke> for StrokePayload {
    fn from(stroke: &Stroke) -> Self {
        Self {
            id: stroke.id.clone(),
            pointer_type: stroke.pointer_type,
            pointer_id: stroke.pointer_id,
            x: stroke.x.clone(),
            y: stroke.y.clone(),
            t: stroke.t.clone(),
            p: stroke.p.clone(),
        }
    }
}

/// Variant A input component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Component {
    /// Ink stroke
    Stroke {
        /// X coordinates
        x: Vec<f64>,
        /// Y coordinates
        y: Vec<f64>,
        /// Timestamps
        t: Vec<u64>,
    },
}

impl From<&Stroke> for Component {
    fn from(stroke: &Stroke) -> Self {
        Self::Stroke {
            x: stroke.x.clone(),
            y: stroke.y.clone(),
            t: stroke.t.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_requests() {
        for (request, kind) in [
            (Request::Undo, "undo"),
            (Request::Redo, "redo"),
            (Request::Clear, "clear"),
            (Request::Convert, "convert"),
            (Request::WaitForIdle, "waitForIdle"),
            (Request::Reset, "reset"),
        ] {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value, json!({ "type": kind }));
            assert_eq!(request.kind(), kind);
        }
    }

    #[test]
    fn test_session_field_casing() {
        let request = Request::RestoreIInkSession {
            iink_session_id: "session-1".to_string(),
            application_key: "AK1".to_string(),
            x_dpi: 96,
            y_dpi: 96,
            view_size_height: 600,
            view_size_width: 800,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "type": "restoreIInkSession",
                "iinkSessionId": "session-1",
                "applicationKey": "AK1",
                "xDpi": 96,
                "yDpi": 96,
                "viewSizeHeight": 600,
                "viewSizeWidth": 800
            })
        );
    }

    #[test]
    fn test_configuration_is_inlined() {
        let mut profile = Map::new();
        profile.insert("lang".to_string(), json!("fr_FR"));
        let value = serde_json::to_value(Request::Configuration { profile }).unwrap();
        assert_eq!(value, json!({ "type": "configuration", "lang": "fr_FR" }));
    }

    #[test]
    fn test_import_keeps_lowercase_mimetype() {
        let request = Request::Import {
            part_id: Some("p1".to_string()),
            mimetype: "application/vnd.myscript.jiix".to_string(),
            data: "{}".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "type": "import",
                "partId": "p1",
                "mimetype": "application/vnd.myscript.jiix",
                "data": "{}"
            })
        );
    }

    #[test]
    fn test_component_wire_shape() {
        let stroke = Stroke::new("s1", PointerType::Pen, 0).with_point(1.0, 2.0, 3, 0.5);
        let value = serde_json::to_value(Component::from(&stroke)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "stroke", "x": [1.0], "y": [2.0], "t": [3] })
        );
    }
}
