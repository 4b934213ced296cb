//! Per-session recognizer state.
//!
//! A [`RecognizerContext`] is owned by exactly one recognizer task; nothing
//! else mutates it.

use std::sync::Arc;

use uuid::Uuid;

use super::handshake::Handshake;
use super::queue::RecognitionQueue;
use super::retry::RetryPolicy;
use crate::codec::v4;
use crate::config::{Config, ProtocolVersion, ViewConfig};
use crate::model::{Model, Positions};

/// Long-lived state of one recognition session
#[derive(Debug)]
pub struct RecognizerContext {
    id: Uuid,
    config: Arc<Config>,
    retry: RetryPolicy,
    instance_id: Option<String>,
    /// Pending correlated actions
    pub queue: RecognitionQueue,
    /// Sent/received stroke positions of the current model
    pub positions: Positions,
    current_part_id: Option<String>,
    session_id: Option<String>,
    view: ViewConfig,
    reconnection_count: u32,
}

impl RecognizerContext {
    /// Create a context for a validated configuration
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            id: Uuid::new_v4(),
            retry: RetryPolicy::from(&config.retry),
            view: config.view,
            config,
            instance_id: None,
            queue: RecognitionQueue::new(),
            positions: Positions::default(),
            current_part_id: None,
            session_id: None,
            reconnection_count: 0,
        }
    }

    /// Local context identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Read-only configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the configuration
    pub fn shared_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Negotiated protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.config.recognition.version
    }

    /// Retry policy
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Server recognition instance, once known
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Record the instance id carried by a result.
    ///
    /// A change is suspicious but not fatal: it is logged and the new value
    /// is kept.
    pub fn update_instance_id(&mut self, instance_id: &str) {
        match self.instance_id.as_deref() {
            Some(known) if known == instance_id => {},
            Some(known) => {
                tracing::warn!(
                    "Instance id changed from {} to {} mid-session, suspicious",
                    known,
                    instance_id
                );
                self.instance_id = Some(instance_id.to_string());
            },
            None => {
                tracing::debug!("Instance id set to {}", instance_id);
                self.instance_id = Some(instance_id.to_string());
            },
        }
    }

    /// Active content part
    pub fn current_part_id(&self) -> Option<&str> {
        self.current_part_id.as_deref()
    }

    /// Record the active content part
    pub fn set_current_part_id(&mut self, part_id: impl Into<String>) {
        self.current_part_id = Some(part_id.into());
    }

    /// Session usable for `restoreIInkSession`
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Record the server session id
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Current canvas geometry
    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    /// Track a canvas resize
    pub fn set_view_size(&mut self, width: u32, height: u32) {
        self.view.width = width;
        self.view.height = height;
    }

    /// Reconnects made since the last successful handshake
    pub fn reconnection_count(&self) -> u32 {
        self.reconnection_count
    }

    /// Whether the reconnect budget allows another attempt
    pub fn should_attempt_immediate_reconnect(&self) -> bool {
        self.reconnection_count < self.retry.max_reconnect_attempts
    }

    /// Count one reconnect attempt
    pub fn record_reconnect_attempt(&mut self) {
        self.reconnection_count += 1;
    }

    /// Reset the reconnect budget
    pub fn reset_reconnection_count(&mut self) {
        self.reconnection_count = 0;
    }

    /// Handshake for the next connection attempt
    pub fn handshake(&self) -> Handshake {
        match self.version() {
            ProtocolVersion::V3 => Handshake::challenge_response(),
            ProtocolVersion::V4 => {
                let opening = match self.session_id() {
                    Some(session_id) => {
                        v4::build_restore_session(&self.config, &self.view, session_id)
                    },
                    None => v4::build_new_content_package(&self.config, &self.view),
                };
                Handshake::content_package(opening)
            },
        }
    }

    /// Rewind position bookkeeping before a (re)connection.
    ///
    /// V4 resends whatever was not acknowledged; a V3 instance does not
    /// survive the connection, so every stroke is sent again with `start`.
    pub fn rewind_for_init(&mut self, model: &mut Model) {
        match self.version() {
            ProtocolVersion::V4 => model.rewind_sent(),
            ProtocolVersion::V3 => {
                model.positions = Positions::default();
                self.instance_id = None;
            },
        }
        self.positions = model.positions;
    }
}
