//! Editor-side ink model.
//!
//! The editor owns the [`Model`]; the protocol layer only appends to it or
//! reads from it. A [`ModelHandle`] is shared between the editor and the
//! recognizer task and is never replaced, so identity is preserved across
//! results.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shared handle to an editor model.
pub type ModelHandle = Arc<Mutex<Model>>;

/// Lock a model handle, recovering from a poisoned lock.
pub(crate) fn lock(model: &ModelHandle) -> MutexGuard<'_, Model> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pointer device that produced a stroke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
    /// Stylus
    #[default]
    Pen,
    /// Finger
    Touch,
    /// Mouse
    Mouse,
}

/// One continuous pointer gesture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Stroke identifier
    pub id: String,
    /// Pointer device
    #[serde(default)]
    pub pointer_type: PointerType,
    /// Pointer identifier
    #[serde(default)]
    pub pointer_id: i64,
    /// X coordinates
    pub x: Vec<f64>,
    /// Y coordinates
    pub y: Vec<f64>,
    /// Timestamps (Unix millis)
    pub t: Vec<u64>,
    /// Pressures
    #[serde(default)]
    pub p: Vec<f64>,
}

impl Stroke {
    /// Create an empty stroke
    pub fn new(id: impl Into<String>, pointer_type: PointerType, pointer_id: i64) -> Self {
        Self {
            id: id.into(),
            pointer_type,
            pointer_id,
            ..Self::default()
        }
    }

    /// Append a sample
    pub fn with_point(mut self, x: f64, y: f64, t: u64, p: f64) -> Self {
        self.x.push(x);
        self.y.push(y);
        self.t.push(t);
        self.p.push(p);
        self
    }
}

/// Sent/received stroke positions.
///
/// A position is the index of a stroke in [`Model::strokes`]; `-1` means
/// nothing yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Positions {
    /// Last stroke position sent to the server
    pub last_sent_position: i64,
    /// Last stroke position acknowledged by a result
    pub last_received_position: i64,
}

impl Default for Positions {
    fn default() -> Self {
        Self {
            last_sent_position: -1,
            last_received_position: -1,
        }
    }
}

/// Raw results attached by the dispatcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResults {
    /// Last recognition result payload
    pub last: Option<Value>,
    /// Last export payload
    pub exports: Option<Value>,
}

/// Document/ink state owned by the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Captured strokes, indexed by position
    pub strokes: Vec<Stroke>,
    /// Stroke position counters
    pub positions: Positions,
    /// Raw server results
    pub raw_results: RawResults,
    /// Incremental recognized symbols, append-only
    pub recognized_symbols: Vec<Value>,
    /// Latest exports keyed by MIME type
    pub exports: Option<Map<String, Value>>,
    /// Undo availability
    pub can_undo: bool,
    /// Redo availability
    pub can_redo: bool,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the model in a shareable handle
    pub fn into_handle(self) -> ModelHandle {
        Arc::new(Mutex::new(self))
    }

    /// Add a captured stroke
    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Position of the last captured stroke
    pub fn last_position(&self) -> i64 {
        self.strokes.len() as i64 - 1
    }

    /// Strokes after `position`
    pub fn strokes_after(&self, position: i64) -> &[Stroke] {
        let start = usize::try_from(position + 1).unwrap_or(0);
        self.strokes.get(start..).unwrap_or(&[])
    }

    /// Mark every captured stroke as sent
    pub fn mark_sent(&mut self) {
        self.positions.last_sent_position = self.last_position();
    }

    /// Mark everything sent as acknowledged
    pub fn mark_received(&mut self) {
        self.positions.last_received_position = self.positions.last_sent_position;
    }

    /// Rewind the sent position to the last acknowledged one
    pub fn rewind_sent(&mut self) {
        self.positions.last_sent_position = self.positions.last_received_position;
    }

    /// Drop all ink and results
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Classification of a result, when one applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecognitionEvent {
    /// Export data arrived
    Exported,
    /// Undo/redo availability changed
    Changed,
    /// A content part was loaded
    Loaded,
}

impl fmt::Display for RecognitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exported => write!(f, "EXPORTED"),
            Self::Changed => write!(f, "CHANGED"),
            Self::Loaded => write!(f, "LOADED"),
        }
    }
}

/// Terminal outcome of an action
#[derive(Debug, Clone)]
pub struct Recognized {
    /// The model the action targeted
    pub model: ModelHandle,
    /// Event classification, if any
    pub event: Option<RecognitionEvent>,
}

impl Recognized {
    /// Outcome without a classification
    pub fn unclassified(model: ModelHandle) -> Self {
        Self { model, event: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(id: &str) -> Stroke {
        Stroke::new(id, PointerType::Pen, 1).with_point(1.0, 2.0, 100, 0.5)
    }

    #[test]
    fn test_strokes_after_sent_position() {
        let mut model = Model::new();
        assert!(model.strokes_after(model.positions.last_sent_position).is_empty());

        model.add_stroke(stroke("s1"));
        model.add_stroke(stroke("s2"));
        assert_eq!(model.strokes_after(model.positions.last_sent_position).len(), 2);

        model.mark_sent();
        assert_eq!(model.positions.last_sent_position, 1);
        assert!(model.strokes_after(model.positions.last_sent_position).is_empty());

        model.add_stroke(stroke("s3"));
        assert_eq!(model.strokes_after(model.positions.last_sent_position)[0].id, "s3");
    }

    #[test]
    fn test_rewind_resends_unacknowledged() {
        let mut model = Model::new();
        model.add_stroke(stroke("s1"));
        model.mark_sent();
        model.mark_received();
        model.add_stroke(stroke("s2"));
        model.mark_sent();

        model.rewind_sent();
        assert_eq!(model.positions.last_sent_position, 0);
        assert_eq!(model.strokes_after(model.positions.last_sent_position)[0].id, "s2");
    }

    #[test]
    fn test_stroke_wire_names() {
        let json = serde_json::to_value(stroke("s1")).unwrap();
        assert_eq!(json["pointerType"], "pen");
        assert_eq!(json["pointerId"], 1);
        assert_eq!(json["t"][0], 100);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(RecognitionEvent::Exported.to_string(), "EXPORTED");
        assert_eq!(RecognitionEvent::Loaded.to_string(), "LOADED");
    }
}
