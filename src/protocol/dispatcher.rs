//! Result dispatcher.
//!
//! Routes every inbound message of a ready session. Correlated results
//! resolve the oldest queued action; handshake traffic and render-only
//! messages never touch the queue.

use super::context::RecognizerContext;
use super::inbound::{RecognitionKind, ResultPayload, ServerMessage};
use super::queue::RecognitionContext;
use crate::error::IinkError;
use crate::model::{self, Model, RecognitionEvent};

/// What the dispatcher did with a message
#[derive(Debug)]
pub enum Dispatch {
    /// Handshake-phase message, left to the handshake state machine
    Handshake,
    /// The oldest action resolved successfully
    Resolved {
        /// Classification of the result
        event: Option<RecognitionEvent>,
    },
    /// The oldest action resolved with a server error
    Rejected,
    /// Acknowledged without queue interaction
    Acknowledged,
    /// Protocol violation; nothing was resolved
    Violation(IinkError),
}

/// Route one inbound message
pub fn dispatch(ctx: &mut RecognizerContext, message: ServerMessage) -> Dispatch {
    match message {
        ServerMessage::HmacChallenge { .. } | ServerMessage::Init => {
            tracing::warn!("Handshake message '{}' on a ready session", message.kind());
            Dispatch::Handshake
        },
        ServerMessage::SessionDescription { session_id } => {
            tracing::info!("Session {} opened", session_id);
            ctx.set_session_id(session_id);
            Dispatch::Handshake
        },
        ServerMessage::ContentPackageDescription { part_count } => {
            tracing::debug!("Content package opened ({:?} part(s))", part_count);
            Dispatch::Handshake
        },
        ServerMessage::Reset => {
            tracing::debug!("Reset acknowledged");
            Dispatch::Acknowledged
        },
        ServerMessage::Render => Dispatch::Acknowledged,
        ServerMessage::Recognition {
            kind,
            instance_id,
            data,
        } => {
            if let Some(instance_id) = instance_id.as_deref() {
                ctx.update_instance_id(instance_id);
            }
            let entry = match dequeue(ctx, message_kind(kind)) {
                Ok(entry) => entry,
                Err(violation) => return violation,
            };
            {
                let mut model = model::lock(&entry.model);
                model.raw_results.last = Some(data);
                model.mark_received();
                ctx.positions = model.positions;
            }
            entry.succeed(None);
            Dispatch::Resolved { event: None }
        },
        ServerMessage::Result(payload) => {
            if payload.is_part_change() {
                if let Some(part_id) = payload.part_id() {
                    ctx.set_current_part_id(part_id);
                }
            }
            let entry = match dequeue(ctx, &payload.kind) {
                Ok(entry) => entry,
                Err(violation) => return violation,
            };
            let event = {
                let mut model = model::lock(&entry.model);
                let event = classify(&payload, &mut model);
                ctx.positions = model.positions;
                event
            };
            tracing::debug!(
                "'{}' resolved '{}' ({})",
                payload.kind,
                entry.action,
                event.map_or_else(|| "unclassified".to_string(), |e| e.to_string())
            );
            entry.succeed(event);
            Dispatch::Resolved { event }
        },
        ServerMessage::Error { code, message } => {
            tracing::error!("Server error: {}", message);
            let entry = match dequeue(ctx, "error") {
                Ok(entry) => entry,
                Err(violation) => return violation,
            };
            entry.fail(IinkError::Server { code, message });
            Dispatch::Rejected
        },
        ServerMessage::Unrecognized { kind, raw } => {
            tracing::error!("Unrecognized message type '{}'", kind);
            tracing::debug!("payload: {}", raw);
            Dispatch::Violation(IinkError::UnexpectedMessage(kind))
        },
    }
}

fn message_kind(kind: RecognitionKind) -> &'static str {
    match kind {
        RecognitionKind::Math => "mathResult",
        RecognitionKind::Text => "textResult",
    }
}

fn dequeue(
    ctx: &mut RecognizerContext,
    kind: &str,
) -> std::result::Result<RecognitionContext, Dispatch> {
    ctx.queue.dequeue_oldest(kind).map_err(|err| {
        tracing::error!("{}", err);
        Dispatch::Violation(err)
    })
}

/// Apply a result payload to its model and classify it.
///
/// Exactly one classification applies, checked in priority order: exports,
/// then undo/redo flags, then part change.
pub fn classify(payload: &ResultPayload, model: &mut Model) -> Option<RecognitionEvent> {
    model.mark_received();
    model.raw_results.last = Some(payload.raw.clone());
    if let Some(updates) = payload.updates() {
        model.recognized_symbols.extend(updates.iter().cloned());
    }
    if let Some(can_undo) = payload.can_undo() {
        model.can_undo = can_undo;
    }
    if let Some(can_redo) = payload.can_redo() {
        model.can_redo = can_redo;
    }

    if let Some(exports) = payload.exports() {
        model.raw_results.exports = Some(payload.raw.clone());
        model.exports = Some(exports.clone());
        Some(RecognitionEvent::Exported)
    } else if payload.can_undo().is_some() || payload.can_redo().is_some() {
        Some(RecognitionEvent::Changed)
    } else if payload.is_part_change() {
        Some(RecognitionEvent::Loaded)
    } else {
        None
    }
}
