//! Recognition context queue.
//!
//! Each correlated action appends one entry before its message is sent; each
//! correlated result removes the oldest entry. No request identifiers are
//! exchanged on the wire: pairing relies on the transport being a single
//! ordered stream and on the server answering every action once, in order.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::{IinkError, Result};
use crate::model::{ModelHandle, RecognitionEvent, Recognized};

/// Completion channel of one action
pub type Completion = oneshot::Sender<Result<Recognized>>;

/// Pending action awaiting its result
#[derive(Debug)]
pub struct RecognitionContext {
    /// Model the action targets
    pub model: ModelHandle,
    /// Action name, for logs
    pub action: &'static str,
    completion: Completion,
}

impl RecognitionContext {
    /// Pair a model with its completion
    pub fn new(model: ModelHandle, action: &'static str, completion: Completion) -> Self {
        Self {
            model,
            action,
            completion,
        }
    }

    /// Resolve successfully
    pub fn succeed(self, event: Option<RecognitionEvent>) {
        let outcome = Recognized {
            model: self.model,
            event,
        };
        if self.completion.send(Ok(outcome)).is_err() {
            tracing::debug!("Caller dropped the pending '{}' result", self.action);
        }
    }

    /// Resolve with an error
    pub fn fail(self, error: IinkError) {
        if self.completion.send(Err(error)).is_err() {
            tracing::debug!("Caller dropped the pending '{}' result", self.action);
        }
    }

    /// Give the completion back (for a retry)
    pub fn into_parts(self) -> (ModelHandle, Completion) {
        (self.model, self.completion)
    }
}

/// FIFO of pending actions
#[derive(Debug, Default)]
pub struct RecognitionQueue {
    entries: VecDeque<RecognitionContext>,
}

impl RecognitionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn enqueue(&mut self, entry: RecognitionContext) {
        tracing::trace!("enqueue '{}' ({} pending)", entry.action, self.entries.len() + 1);
        self.entries.push_back(entry);
    }

    /// Remove the head.
    ///
    /// An empty queue means a spurious or duplicated server message; `kind`
    /// names the message for the error.
    pub fn dequeue_oldest(&mut self, kind: &str) -> Result<RecognitionContext> {
        self.entries
            .pop_front()
            .ok_or_else(|| IinkError::EmptyQueue(kind.to_string()))
    }

    /// Take back the entry enqueued last (its send failed)
    pub fn retract_latest(&mut self) -> Option<RecognitionContext> {
        self.entries.pop_back()
    }

    /// Pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every pending entry with an error; returns how many
    pub fn fail_all(&mut self, error: impl Fn() -> IinkError) -> usize {
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.fail(error());
        }
        count
    }
}
