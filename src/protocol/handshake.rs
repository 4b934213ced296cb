//! Connection handshake state machine.
//!
//! ```text
//!              on_opened()             on_sent()
//!     [Idle] ───────────> [Opened] ──────────────> [AwaitingChallenge]      (variant A)
//!                             │                          │ hmacChallenge
//!                             │ on_sent()                v
//!                             │ (variant B)      [ChallengeAnswered]
//!                             │                          │ on_sent()
//!                             │                          v
//!                             │                   [AwaitingInit]
//!                             │                          │ init
//!                             v                          v
//!                          [Ready] <─────────────────────┘
//! ```
//!
//! Any message the current state does not expect moves the machine to
//! `Failed` and surfaces an error; there is no silent continuation.

use std::fmt;

use super::inbound::ServerMessage;
use crate::codec::{v3, Request};
use crate::config::Config;
use crate::error::{IinkError, Result};

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Transport not opened yet
    Idle,
    /// Transport opened, first message being sent
    Opened,
    /// Application key sent
    AwaitingChallenge,
    /// Challenge answer being sent
    ChallengeAnswered,
    /// Challenge answered, waiting for `init`
    AwaitingInit,
    /// Session ready for actions
    Ready,
    /// Handshake rejected
    Failed,
}

/// Setup outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ready {
    /// Variant A: the server acknowledged the challenge answer
    InitDone,
    /// Variant B: the session message was sent
    SessionOpened,
}

impl fmt::Display for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitDone => write!(f, "Init done"),
            Self::SessionOpened => write!(f, "Session opened"),
        }
    }
}

/// What the driver must do after an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeStep {
    /// Send this request, then call [`Handshake::on_sent`]
    Reply(Request),
    /// Handshake complete
    Ready,
}

#[derive(Debug, Clone)]
enum Variant {
    ChallengeResponse,
    ContentPackage { opening: Request },
}

/// Handshake for one connection attempt
#[derive(Debug, Clone)]
pub struct Handshake {
    variant: Variant,
    state: HandshakeState,
}

impl Handshake {
    /// Variant A: application key, HMAC challenge, `init`
    pub fn challenge_response() -> Self {
        Self {
            variant: Variant::ChallengeResponse,
            state: HandshakeState::Idle,
        }
    }

    /// Variant B: a single session message (`newContentPackage` or
    /// `restoreIInkSession`)
    pub fn content_package(opening: Request) -> Self {
        Self {
            variant: Variant::ContentPackage { opening },
            state: HandshakeState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Setup outcome once ready
    pub fn ready(&self) -> Option<Ready> {
        match (self.state, &self.variant) {
            (HandshakeState::Ready, Variant::ChallengeResponse) => Some(Ready::InitDone),
            (HandshakeState::Ready, Variant::ContentPackage { .. }) => Some(Ready::SessionOpened),
            _ => None,
        }
    }

    /// Transport opened: first message to send
    pub fn on_opened(&mut self, config: &Config) -> Result<Request> {
        if self.state != HandshakeState::Idle {
            return Err(self.fail(format!("transport opened twice (state {:?})", self.state)));
        }
        self.state = HandshakeState::Opened;
        Ok(match &self.variant {
            Variant::ChallengeResponse => v3::build_application_key(config),
            Variant::ContentPackage { opening } => opening.clone(),
        })
    }

    /// The last requested message was sent
    pub fn on_sent(&mut self) {
        self.state = match (self.state, &self.variant) {
            (HandshakeState::Opened, Variant::ChallengeResponse) => {
                HandshakeState::AwaitingChallenge
            },
            (HandshakeState::Opened, Variant::ContentPackage { .. }) => HandshakeState::Ready,
            (HandshakeState::ChallengeAnswered, _) => HandshakeState::AwaitingInit,
            (state, _) => state,
        };
    }

    /// Handle an inbound message before the session is ready
    pub fn on_message(&mut self, message: &ServerMessage, config: &Config) -> Result<HandshakeStep> {
        match (self.state, message) {
            (HandshakeState::AwaitingChallenge, ServerMessage::HmacChallenge { challenge }) => {
                let answer = v3::build_hmac_answer(challenge, config)?;
                self.state = HandshakeState::ChallengeAnswered;
                Ok(HandshakeStep::Reply(answer))
            },
            (HandshakeState::AwaitingInit, ServerMessage::Init) => {
                self.state = HandshakeState::Ready;
                Ok(HandshakeStep::Ready)
            },
            (_, ServerMessage::Error { code, message }) => {
                self.state = HandshakeState::Failed;
                tracing::error!("Server refused the handshake: {}", message);
                Err(IinkError::Server {
                    code: code.clone(),
                    message: message.clone(),
                })
            },
            (state, other) => {
                tracing::error!(
                    "Unexpected message '{}' during handshake (state {:?})",
                    other.kind(),
                    state
                );
                tracing::debug!("payload: {:?}", other);
                self.state = HandshakeState::Failed;
                Err(IinkError::UnexpectedMessage(format!(
                    "'{}' while {:?}",
                    other.kind(),
                    state
                )))
            },
        }
    }

    /// Mark the handshake failed and build the error to surface
    pub fn fail(&mut self, reason: impl Into<String>) -> IinkError {
        self.state = HandshakeState::Failed;
        IinkError::Handshake(reason.into())
    }
}
