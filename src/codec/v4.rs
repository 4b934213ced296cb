//! Variant B message builders (iink document protocol).
//!
//! The session is opened with `newContentPackage` (or `restoreIInkSession`)
//! as soon as the transport is open; every later message is an action
//! answered by exactly one result.

use super::request::{Request, StrokePayload};
use super::style::{to_inline_css, to_stylesheet, PenStyle, Theme};
use super::take_pending;
use crate::config::{Config, ViewConfig};
use crate::model::{Model, Positions};

/// Open a fresh content package
pub fn build_new_content_package(config: &Config, view: &ViewConfig) -> Request {
    Request::NewContentPackage {
        application_key: config.server.application_key.clone(),
        x_dpi: view.dpi,
        y_dpi: view.dpi,
        view_size_height: view.height,
        view_size_width: view.width,
    }
}

/// Restore a previous session
pub fn build_restore_session(config: &Config, view: &ViewConfig, session_id: &str) -> Request {
    Request::RestoreIInkSession {
        iink_session_id: session_id.to_string(),
        application_key: config.server.application_key.clone(),
        x_dpi: view.dpi,
        y_dpi: view.dpi,
        view_size_height: view.height,
        view_size_width: view.width,
    }
}

/// Create a content part of the configured type
pub fn build_new_content_part(config: &Config) -> Request {
    Request::NewContentPart {
        content_type: config.recognition.content_type.as_str().to_string(),
        mime_types: config.requested_mime_types(),
    }
}

/// Open an existing content part
pub fn build_open_content_part(config: &Config, part_id: &str) -> Request {
    Request::OpenContentPart {
        id: part_id.to_string(),
        mime_types: config.requested_mime_types(),
    }
}

/// Send the server profile
pub fn build_configuration(config: &Config) -> Request {
    Request::Configuration {
        profile: config.recognition.v4.clone(),
    }
}

/// Batch every stroke after the last sent position.
///
/// Returns `None` when there is nothing new; the sent position advances
/// otherwise.
pub fn build_add_strokes(positions: &mut Positions, model: &mut Model) -> Option<Request> {
    let strokes = take_pending(positions, model, |stroke| StrokePayload::from(stroke))?;
    Some(Request::AddStrokes { strokes })
}

/// Undo
pub fn build_undo() -> Request {
    Request::Undo
}

/// Redo
pub fn build_redo() -> Request {
    Request::Redo
}

/// Clear
pub fn build_clear() -> Request {
    Request::Clear
}

/// Convert
pub fn build_convert() -> Request {
    Request::Convert
}

/// Zoom
pub fn build_zoom(value: f64) -> Request {
    Request::Zoom { zoom: value }
}

/// Canvas resize
pub fn build_resize(view: &ViewConfig) -> Request {
    Request::ChangeViewSize {
        height: view.height,
        width: view.width,
    }
}

/// Explicit export; always names the MIME types
pub fn build_export(config: &Config, part_id: Option<&str>) -> Request {
    Request::Export {
        part_id: part_id.map(str::to_string),
        mime_types: config.recognition.mime_types(),
    }
}

/// Import content into a part
pub fn build_import(part_id: Option<&str>, mimetype: &str, data: &str) -> Request {
    Request::Import {
        part_id: part_id.map(str::to_string),
        mimetype: mimetype.to_string(),
        data: data.to_string(),
    }
}

/// Wait for the server to settle
pub fn build_wait_for_idle() -> Request {
    Request::WaitForIdle
}

/// Pen style; an absent style is sent as an empty string
pub fn build_set_pen_style(style: Option<&PenStyle>) -> Request {
    Request::SetPenStyle {
        style: style.map(to_inline_css).unwrap_or_default(),
    }
}

/// Theme stylesheet
pub fn build_set_theme(theme: &Theme) -> Request {
    Request::SetTheme {
        theme: to_stylesheet(theme),
    }
}
