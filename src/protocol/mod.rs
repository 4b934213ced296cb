//! Session protocol: handshake, correlation and dispatch.
//!
//! # Message Flow
//!
//! ```text
//! Editor            Recognizer task                  Server
//!    |                    |                             |
//!    |---- init --------->|==== handshake (A or B) ====>|
//!    |<--- Init done -----|<============================|
//!    |                    |                             |
//!    |---- action ------->|  enqueue(model, completion) |
//!    |                    |---- action message -------->|
//!    |                    |<--- result -----------------|
//!    |                    |  dequeue oldest, classify   |
//!    |<--- Recognized ----|                             |
//! ```
//!
//! ## Components
//!
//! | Module       | Responsibility                                   |
//! |--------------|--------------------------------------------------|
//! | `inbound`    | Closed sum type over server messages             |
//! | `handshake`  | Variant A/B connection state machine             |
//! | `queue`      | FIFO of pending actions                          |
//! | `dispatcher` | Result routing and event classification          |
//! | `context`    | Per-session state (instance id, positions, part) |
//! | `retry`      | Send retry and reconnect bounds                  |

mod context;
mod dispatcher;
mod handshake;
mod inbound;
mod queue;
mod retry;

pub use context::RecognizerContext;
pub use dispatcher::{classify, dispatch, Dispatch};
pub use handshake::{Handshake, HandshakeState, HandshakeStep, Ready};
pub use inbound::{RecognitionKind, ResultPayload, ServerMessage};
pub use queue::{Completion, RecognitionContext, RecognitionQueue};
pub use retry::RetryPolicy;
