//! # iink Protocol - Ink Recognition Client
//!
//! Client-side protocol engine for WebSocket handwriting recognition
//! sessions: connection handshake, message codec, request/result
//! correlation, event classification and bounded retry/reconnect.
//!
//! ## Features
//!
//! - **Two protocol variants**: HMAC challenge/response (`v3`) and content
//!   package sessions (`v4`)
//! - **FIFO correlation**: every action resolves exactly once, in send order
//! - **Event classification**: `EXPORTED`, `CHANGED`, `LOADED`
//! - **Bounded recovery**: send retries with exponential backoff, capped
//!   reconnects
//! - **Single-writer actor**: one task owns each session's state
//!
//! ## Protocol Overview
//!
//! ### Handshake
//!
//! ```text
//! Variant A (v3)                            Variant B (v4)
//!
//! Client                   Server           Client                      Server
//!    |-- applicationKey ---->|                 |-- newContentPackage ---->|
//!    |<-- hmacChallenge -----|                 |   or restoreIInkSession  |
//!    |-- hmac -------------->|                 |                          |
//!    |<-- init --------------|                 |   (ready once sent)      |
//! ```
//!
//! ### State Machine
//!
//! ```text
//!     [Idle] ──opened──> [Opened] ──sent──> [AwaitingChallenge]
//!                            │                     │ hmacChallenge
//!                            │ sent (B)            v
//!                            │              [ChallengeAnswered]
//!                            │                     │ sent
//!                            │                     v
//!                            │               [AwaitingInit]
//!                            v                     │ init
//!                         [Ready] <────────────────┘
//! ```
//!
//! ### Message Types
//!
//! | Type                              | Direction     | Correlated |
//! |-----------------------------------|---------------|------------|
//! | `applicationKey` / `hmac`         | Client→Server | No         |
//! | `hmacChallenge` / `init`          | Server→Client | No         |
//! | `start` / `continue`              | Client→Server | Yes        |
//! | `mathResult` / `textResult`       | Server→Client | Yes        |
//! | `reset`                           | Both          | No         |
//! | `newContentPackage`               | Client→Server | No         |
//! | `newContentPart`, `addStrokes`... | Client→Server | Yes        |
//! | result payloads, `error`          | Server→Client | Yes        |
//! | `svgPatch`, `sessionDescription`  | Server→Client | No         |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use iink::{Config, Model, Recognizer, RecognitionEvent, WebSocketTransport};
//!
//! let config = Config::load_default()?.with_env();
//! let recognizer = Recognizer::spawn(config, WebSocketTransport::new())?;
//!
//! let model = Model::new().into_handle();
//! recognizer.init(&model).await?;
//! recognizer.new_content_part(&model).await?;
//!
//! // capture strokes into the model, then
//! recognizer.add_strokes(&model).await?;
//! let outcome = recognizer.export_content(&model).await?;
//! assert_eq!(outcome.event, Some(RecognitionEvent::Exported));
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Outbound message builders
//! - [`protocol`]: Handshake, queue, dispatcher, retry policy
//! - [`recognizer`]: Per-session task and its handle
//! - [`transport`]: Transport abstraction and WebSocket client
//! - [`model`]: Editor ink model
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod protocol;
pub mod recognizer;
pub mod transport;

// Re-exports for convenience
pub use codec::{compute_hmac, PenStyle, Request, Theme};
pub use config::{Config, ContentType, ProtocolVersion, Trigger};
pub use error::{IinkError, Result};
pub use model::{Model, ModelHandle, PointerType, RecognitionEvent, Recognized, Stroke};
pub use protocol::{HandshakeState, Ready, ServerMessage};
pub use recognizer::{Action, Pending, Recognizer};
pub use transport::{Transport, TransportEvent, WebSocketTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
