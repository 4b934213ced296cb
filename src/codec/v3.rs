//! Variant A message builders (challenge/response protocol).
//!
//! ```text
//! Client                                   Server
//!    |---- applicationKey ----------------->|
//!    |<--- hmacChallenge -------------------|
//!    |---- hmac --------------------------->|
//!    |<--- init ----------------------------|
//!    |---- start (parameters, strokes) ---->|
//!    |<--- mathResult / textResult ---------|  carries instanceId
//!    |---- continue (strokes) ------------->|
//!    |<--- mathResult / textResult ---------|
//! ```

use super::challenge::compute_hmac;
use super::request::{Component, Request};
use super::take_pending;
use crate::config::Config;
use crate::error::Result;
use crate::model::{Model, Positions};

/// First handshake message
pub fn build_application_key(config: &Config) -> Request {
    Request::ApplicationKey {
        application_key: config.server.application_key.clone(),
    }
}

/// Answer an HMAC challenge
pub fn build_hmac_answer(challenge: &str, config: &Config) -> Result<Request> {
    let server = &config.server;
    Ok(Request::Hmac {
        application_key: server.application_key.clone(),
        challenge: challenge.to_string(),
        hmac: compute_hmac(challenge, &server.application_key, &server.hmac_key)?,
    })
}

/// Stroke batch: `start` when nothing was sent yet, `continue` otherwise.
///
/// Returns `None` when there is nothing new to send.
pub fn build_recognition_input(
    positions: &mut Positions,
    model: &mut Model,
    config: &Config,
) -> Option<Request> {
    let first_batch = positions.last_sent_position < 0;
    let components = take_pending(positions, model, |stroke| Component::from(stroke))?;
    if first_batch {
        Some(Request::Start {
            parameters: config.recognition.v3_parameters(),
            components,
        })
    } else {
        Some(Request::Continue { components })
    }
}

/// Drop the server-side instance content
pub fn build_reset() -> Request {
    Request::Reset
}
