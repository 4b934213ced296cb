//! iink Protocol error types.
//!
//! # Error Classification
//!
//! | Class                  | Variants                                      | Handling                    |
//! |------------------------|-----------------------------------------------|-----------------------------|
//! | Protocol violation     | `UnexpectedMessage`, `EmptyQueue`             | Logged, pending call fails  |
//! | Transport failure      | `Transport`, `ConnectionClosed`               | Retried with reconnect      |
//! | Handshake failure      | `Handshake`, `HandshakeTimeout`               | Bounded reconnect           |
//! | Exhausted budgets      | `SendFailed`, `ReconnectExhausted`            | Surfaced to the caller      |
//! | Server-reported        | `Server`                                      | Surfaced to the caller      |
//!
//! Instance id mismatches are not errors: they are logged as warnings and the
//! session continues.

use thiserror::Error;

/// iink Protocol errors.
#[derive(Error, Debug)]
pub enum IinkError {
    /// Inbound message that the current phase does not accept.
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// A correlated result arrived with nothing pending.
    #[error("Protocol consistency error: result received with no pending request ({0})")]
    EmptyQueue(String),

    /// Handshake did not reach the ready state.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Handshake did not complete in time.
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// Connection closed while a request was pending.
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Transport-level failure (connect, send, close).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Send kept failing after every retry attempt.
    #[error("Send failed after {attempts} attempt(s): {source}")]
    SendFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Last failure.
        #[source]
        source: Box<IinkError>,
    },

    /// Reconnection budget is exhausted.
    #[error("Unable to reconnect after {attempts} attempt(s): {source}")]
    ReconnectExhausted {
        /// Reconnect attempts made before giving up.
        attempts: u32,
        /// Original handshake failure.
        #[source]
        source: Box<IinkError>,
    },

    /// Error reported by the recognition server.
    #[error("Server error{}: {message}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Server {
        /// Server error code, when given.
        code: Option<String>,
        /// Server error message.
        message: String,
    },

    /// Action not available on the negotiated protocol version.
    #[error("Action '{action}' is not supported by protocol {version}")]
    Unsupported {
        /// Action name.
        action: &'static str,
        /// Protocol version.
        version: String,
    },

    /// The recognizer task is gone.
    #[error("Recognizer stopped")]
    RecognizerStopped,

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Keyed hash computation failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IinkError {
    /// Whether a fresh connection may cure the error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionClosed(_)
                | Self::Handshake(_)
                | Self::HandshakeTimeout(_)
                | Self::UnexpectedMessage(_)
        )
    }
}

/// Result type alias for iink operations
pub type Result<T> = std::result::Result<T, IinkError>;

impl From<toml::de::Error> for IinkError {
    fn from(err: toml::de::Error) -> Self {
        IinkError::Config(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for IinkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        IinkError::Transport(err.to_string())
    }
}
