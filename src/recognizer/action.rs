//! Editor actions and their per-version message builders.

use crate::codec::{v3, v4, PenStyle, Request, Theme};
use crate::config::ProtocolVersion;
use crate::error::{IinkError, Result};
use crate::model::{Model, Positions};
use crate::protocol::RecognizerContext;

/// Action requested by the editor
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Create a content part of the configured type
    NewContentPart,
    /// Open an existing content part
    OpenContentPart {
        /// Part identifier
        part_id: String,
    },
    /// Send the server profile
    Configure,
    /// Send strokes captured since the last batch
    AddStrokes,
    /// Undo
    Undo,
    /// Redo
    Redo,
    /// Clear the document
    Clear,
    /// Convert ink to typeset content
    Convert,
    /// Request exports for the active part
    Export,
    /// Import content into the active part
    Import {
        /// MIME type of `data`
        mimetype: String,
        /// Content to import
        data: String,
    },
    /// Wait until the server is idle
    WaitForIdle,
    /// Canvas resized
    Resize {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Zoom
    Zoom(f64),
    /// Pen style; `None` resets it
    SetPenStyle(Option<PenStyle>),
    /// Theme
    SetTheme(Theme),
}

/// Message built for an action
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Built {
    /// Answered by exactly one correlated result
    Correlated(Request),
    /// Resolved as soon as it is sent
    Uncorrelated(Request),
    /// Nothing to send
    Nothing,
}

impl Action {
    /// Action name, as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewContentPart => "newContentPart",
            Self::OpenContentPart { .. } => "openContentPart",
            Self::Configure => "configuration",
            Self::AddStrokes => "addStrokes",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::Convert => "convert",
            Self::Export => "export",
            Self::Import { .. } => "import",
            Self::WaitForIdle => "waitForIdle",
            Self::Resize { .. } => "changeViewSize",
            Self::Zoom(_) => "zoom",
            Self::SetPenStyle(_) => "setPenStyle",
            Self::SetTheme(_) => "setTheme",
        }
    }

    /// Whether building the action advances the sent position
    pub(crate) fn advances_positions(&self) -> bool {
        matches!(self, Self::AddStrokes)
    }

    /// Local effect of an uncorrelated action, applied once its message is sent
    pub(crate) fn after_send(&self, ctx: &mut RecognizerContext, model: &mut Model) {
        if matches!(self, Self::Clear) {
            model.clear();
            ctx.positions = Positions::default();
        }
    }

    /// Build the message for the negotiated protocol version
    pub(crate) fn build(&self, ctx: &mut RecognizerContext, model: &mut Model) -> Result<Built> {
        ctx.positions = model.positions;
        match ctx.version() {
            ProtocolVersion::V3 => self.build_v3(ctx, model),
            ProtocolVersion::V4 => Ok(self.build_v4(ctx, model)),
        }
    }

    fn build_v3(&self, ctx: &mut RecognizerContext, model: &mut Model) -> Result<Built> {
        match self {
            Self::AddStrokes => {
                let config = ctx.shared_config();
                Ok(
                    match v3::build_recognition_input(&mut ctx.positions, model, &config) {
                        Some(request) => Built::Correlated(request),
                        None => Built::Nothing,
                    },
                )
            },
            Self::Clear => Ok(Built::Uncorrelated(v3::build_reset())),
            _ => Err(IinkError::Unsupported {
                action: self.name(),
                version: ctx.version().to_string(),
            }),
        }
    }

    fn build_v4(&self, ctx: &mut RecognizerContext, model: &mut Model) -> Built {
        let config = ctx.shared_config();
        let request = match self {
            Self::NewContentPart => v4::build_new_content_part(&config),
            Self::OpenContentPart { part_id } => {
                ctx.set_current_part_id(part_id.as_str());
                v4::build_open_content_part(&config, part_id)
            },
            Self::Configure => v4::build_configuration(&config),
            Self::AddStrokes => match v4::build_add_strokes(&mut ctx.positions, model) {
                Some(request) => request,
                None => return Built::Nothing,
            },
            Self::Undo => v4::build_undo(),
            Self::Redo => v4::build_redo(),
            Self::Clear => v4::build_clear(),
            Self::Convert => v4::build_convert(),
            Self::Export => v4::build_export(&config, ctx.current_part_id()),
            Self::Import { mimetype, data } => {
                v4::build_import(ctx.current_part_id(), mimetype, data)
            },
            Self::WaitForIdle => v4::build_wait_for_idle(),
            Self::Resize { width, height } => {
                ctx.set_view_size(*width, *height);
                v4::build_resize(ctx.view())
            },
            Self::Zoom(value) => v4::build_zoom(*value),
            Self::SetPenStyle(style) => v4::build_set_pen_style(style.as_ref()),
            Self::SetTheme(theme) => v4::build_set_theme(theme),
        };
        Built::Correlated(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ContentType};
    use crate::model::{PointerType, Stroke};
    use std::sync::Arc;

    fn context(version: ProtocolVersion) -> RecognizerContext {
        let mut config = Config::default();
        config.server.application_key = "AK1".to_string();
        config.server.hmac_key = "HK1".to_string();
        config.recognition.version = version;
        config.recognition.content_type = ContentType::Math;
        RecognizerContext::new(Arc::new(config))
    }

    fn model_with_stroke() -> Model {
        let mut model = Model::new();
        model.add_stroke(Stroke::new("s1", PointerType::Pen, 0).with_point(0.0, 0.0, 1, 0.5));
        model
    }

    #[test]
    fn test_v4_add_strokes_then_nothing() {
        let mut ctx = context(ProtocolVersion::V4);
        let mut model = model_with_stroke();

        match Action::AddStrokes.build(&mut ctx, &mut model).unwrap() {
            Built::Correlated(request) => assert_eq!(request.kind(), "addStrokes"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctx.positions.last_sent_position, 0);
        assert_eq!(
            Action::AddStrokes.build(&mut ctx, &mut model).unwrap(),
            Built::Nothing
        );
    }

    #[test]
    fn test_v4_part_tracking() {
        let mut ctx = context(ProtocolVersion::V4);
        let mut model = Model::new();
        let open = Action::OpenContentPart {
            part_id: "p1".to_string(),
        };
        open.build(&mut ctx, &mut model).unwrap();
        assert_eq!(ctx.current_part_id(), Some("p1"));

        match Action::Export.build(&mut ctx, &mut model).unwrap() {
            Built::Correlated(Request::Export { part_id, .. }) => {
                assert_eq!(part_id.as_deref(), Some("p1"));
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_v4_resize_tracks_view() {
        let mut ctx = context(ProtocolVersion::V4);
        let mut model = Model::new();
        let resize = Action::Resize {
            width: 320,
            height: 240,
        };
        assert_eq!(
            resize.build(&mut ctx, &mut model).unwrap(),
            Built::Correlated(Request::ChangeViewSize {
                height: 240,
                width: 320
            })
        );
        assert_eq!(ctx.view().width, 320);
    }

    #[test]
    fn test_v3_actions() {
        let mut ctx = context(ProtocolVersion::V3);
        let mut model = model_with_stroke();

        match Action::AddStrokes.build(&mut ctx, &mut model).unwrap() {
            Built::Correlated(request) => assert_eq!(request.kind(), "start"),
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            Action::Clear.build(&mut ctx, &mut model).unwrap(),
            Built::Uncorrelated(Request::Reset)
        );
        // ink stays until the reset is on the wire
        assert_eq!(model.strokes.len(), 1);

        Action::Clear.after_send(&mut ctx, &mut model);
        assert!(model.strokes.is_empty());
        assert_eq!(ctx.positions, Positions::default());

        let err = Action::Undo.build(&mut ctx, &mut model).unwrap_err();
        assert!(matches!(
            err,
            IinkError::Unsupported {
                action: "undo",
                ..
            }
        ));
    }
}
