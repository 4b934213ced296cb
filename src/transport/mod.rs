//! Transport layer abstraction for iink sessions.
//!
//! The protocol engine only needs an ordered, full-duplex text channel:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Recognizer task              │
//! │         (Transport-Agnostic)            │
//! └──────────────────┬──────────────────────┘
//!                    │  connect / send / close
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │ WebSocketTransp │ │ scripted (tests)│
//! │ (tokio-tungst.) │ │                 │
//! └─────────────────┘ └─────────────────┘
//! ```
//!
//! Inbound traffic is delivered as [`TransportEvent`]s over the channel
//! returned by [`Transport::connect`]; the first event of a successful
//! connection is [`TransportEvent::Opened`].

mod websocket;

pub use websocket::WebSocketTransport;

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;

/// Boxed future returned by transport operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capacity of the inbound event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Inbound transport event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection is open and writable
    Opened,
    /// Text frame
    Message(String),
    /// Peer closed the connection
    Closed {
        /// Close code, when given
        code: Option<u16>,
        /// Close reason
        reason: String,
    },
    /// Read failure; the connection is unusable
    Error(String),
}

/// Transport trait for pluggable connection backends.
///
/// A transport owns at most one live connection. `connect` replaces any
/// previous connection.
pub trait Transport: Send {
    /// Open a connection; inbound events arrive on the returned channel.
    fn connect<'a>(&'a mut self, url: &'a Url)
        -> BoxFuture<'a, Result<mpsc::Receiver<TransportEvent>>>;

    /// Send one text frame.
    fn send(&mut self, message: String) -> BoxFuture<'_, Result<()>>;

    /// Close the connection, if any.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}
