//! Recognizer task: the single writer of a [`RecognizerContext`].
//!
//! Commands from the editor and events from the transport are processed
//! strictly one at a time, so the queue, the positions and the handshake
//! never see concurrent mutation. A reconnect runs to completion before the
//! next command is looked at.

use std::sync::Arc;

use backoff::backoff::Backoff;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use super::action::{Action, Built};
use crate::codec::Request;
use crate::error::{IinkError, Result};
use crate::model::{self, ModelHandle, Positions, Recognized};
use crate::protocol::{
    dispatch, Completion, Dispatch, HandshakeStep, Ready, RecognitionContext, RecognizerContext,
    ServerMessage,
};
use crate::transport::{Transport, TransportEvent};

/// Command sent by a [`Recognizer`](super::Recognizer) handle
#[derive(Debug)]
pub(crate) enum Command {
    /// Connect and run the handshake for `model`
    Init {
        model: ModelHandle,
        reply: oneshot::Sender<Result<Ready>>,
    },
    /// Perform an action on `model`
    Act {
        action: Action,
        model: ModelHandle,
        reply: Completion,
    },
    /// Fail pending actions and close the connection
    Close { reply: oneshot::Sender<Result<()>> },
}

pub(crate) struct RecognizerTask<T> {
    ctx: RecognizerContext,
    transport: T,
    events: Option<mpsc::Receiver<TransportEvent>>,
    commands: mpsc::UnboundedReceiver<Command>,
    model: Option<ModelHandle>,
}

async fn next_event(events: &mut Option<mpsc::Receiver<TransportEvent>>) -> Option<TransportEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

impl<T: Transport> RecognizerTask<T> {
    pub(crate) fn new(
        ctx: RecognizerContext,
        transport: T,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            ctx,
            transport,
            events: None,
            commands,
            model: None,
        }
    }

    pub(crate) async fn run(self) {
        let span = tracing::info_span!("recognizer", id = %self.ctx.id());
        self.run_loop().instrument(span).await;
    }

    async fn run_loop(mut self) {
        tracing::info!(
            "Recognizer started ({} over {})",
            self.ctx.version(),
            self.transport.name()
        );
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Close { reply }) => {
                        let result = self.shutdown("recognizer closed").await;
                        let _ = reply.send(result);
                        break;
                    },
                    Some(command) => self.handle_command(command).await,
                    None => {
                        let _ = self.shutdown("every recognizer handle dropped").await;
                        break;
                    },
                },
                event = next_event(&mut self.events) => self.handle_event(event),
            }
        }
        tracing::info!("Recognizer stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Init { model, reply } => {
                self.model = Some(model);
                let result = self.establish().await;
                let _ = reply.send(result);
            },
            Command::Act {
                action,
                model,
                reply,
            } => self.perform(action, model, reply).await,
            Command::Close { reply } => {
                let _ = reply.send(self.shutdown("recognizer closed").await);
            },
        }
    }

    fn handle_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Message(text)) => {
                let message = match ServerMessage::parse(&text, self.ctx.version()) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!("Malformed server message: {}", e);
                        return;
                    },
                };
                tracing::debug!("<- {}", message.kind());
                match dispatch(&mut self.ctx, message) {
                    Dispatch::Violation(err) => {
                        tracing::debug!("Protocol violation ignored by the queue: {}", err);
                    },
                    Dispatch::Resolved { .. }
                    | Dispatch::Rejected
                    | Dispatch::Acknowledged
                    | Dispatch::Handshake => {},
                }
            },
            Some(TransportEvent::Opened) => {
                tracing::debug!("Transport reported open on a ready session");
            },
            Some(TransportEvent::Closed { code, reason }) => {
                tracing::info!("Connection closed by server (code {:?}): {}", code, reason);
                self.connection_lost(format!("closed by server: {reason}"));
            },
            Some(TransportEvent::Error(e)) => {
                tracing::warn!("Transport error: {}", e);
                self.connection_lost(e);
            },
            None => self.connection_lost("event stream ended".to_string()),
        }
    }

    fn connection_lost(&mut self, reason: String) {
        self.events = None;
        let failed = self
            .ctx
            .queue
            .fail_all(|| IinkError::ConnectionClosed(reason.clone()));
        if failed > 0 {
            tracing::warn!("{} pending action(s) failed: {}", failed, reason);
        }
    }

    async fn drop_connection(&mut self, reason: &str) {
        self.connection_lost(reason.to_string());
        if let Err(e) = self.transport.close().await {
            tracing::debug!("Closing previous connection: {}", e);
        }
    }

    async fn shutdown(&mut self, reason: &str) -> Result<()> {
        self.connection_lost(reason.to_string());
        self.transport.close().await
    }

    /// Connect and handshake, reconnecting within the configured budget
    async fn establish(&mut self) -> Result<Ready> {
        loop {
            match self.connect_and_handshake().await {
                Ok(ready) => {
                    self.ctx.reset_reconnection_count();
                    tracing::info!("{}", ready);
                    return Ok(ready);
                },
                Err(err) if err.is_transient() && self.ctx.should_attempt_immediate_reconnect() => {
                    self.ctx.record_reconnect_attempt();
                    tracing::warn!(
                        "Handshake failed ({}), reconnecting ({}/{})",
                        err,
                        self.ctx.reconnection_count(),
                        self.ctx.retry().max_reconnect_attempts
                    );
                },
                Err(err) => {
                    let attempts = self.ctx.reconnection_count();
                    self.ctx.reset_reconnection_count();
                    self.drop_connection("handshake failed").await;
                    tracing::error!("Handshake failed: {}", err);
                    if attempts == 0 {
                        return Err(err);
                    }
                    return Err(IinkError::ReconnectExhausted {
                        attempts,
                        source: Box::new(err),
                    });
                },
            }
        }
    }

    async fn connect_and_handshake(&mut self) -> Result<Ready> {
        self.drop_connection("connection replaced").await;
        if let Some(model) = &self.model {
            let mut model = model::lock(model);
            self.ctx.rewind_for_init(&mut model);
        }
        let timeout = self.ctx.retry().handshake_timeout;
        match tokio::time::timeout(timeout, self.open_session()).await {
            Ok(result) => result,
            Err(_) => Err(IinkError::HandshakeTimeout(timeout)),
        }
    }

    async fn open_session(&mut self) -> Result<Ready> {
        let endpoint = self.ctx.config().endpoint()?;
        let mut events = self.transport.connect(&endpoint).await?;
        let mut handshake = self.ctx.handshake();

        loop {
            match events.recv().await {
                Some(TransportEvent::Opened) => {
                    let opening = handshake.on_opened(self.ctx.config())?;
                    self.send_request(&opening).await?;
                    handshake.on_sent();
                },
                Some(TransportEvent::Message(text)) => {
                    let message = ServerMessage::parse(&text, self.ctx.version())
                        .map_err(|e| handshake.fail(format!("malformed message: {e}")))?;
                    tracing::debug!("<- {}", message.kind());
                    if let HandshakeStep::Reply(reply) =
                        handshake.on_message(&message, self.ctx.config())?
                    {
                        self.send_request(&reply).await?;
                        handshake.on_sent();
                    }
                },
                Some(TransportEvent::Closed { reason, .. }) => {
                    return Err(handshake.fail(format!("connection closed ({reason})")));
                },
                Some(TransportEvent::Error(e)) => return Err(IinkError::Transport(e)),
                None => return Err(handshake.fail("event stream ended")),
            }

            if let Some(ready) = handshake.ready() {
                self.events = Some(events);
                return Ok(ready);
            }
        }
    }

    async fn send_request(&mut self, request: &Request) -> Result<()> {
        let payload = request.to_json()?;
        tracing::debug!("-> {}", request.kind());
        tracing::trace!("{}", payload);
        self.transport.send(payload).await
    }

    /// Perform one action with bounded retries.
    ///
    /// Every attempt after a transport failure reconnects first; the
    /// completion is resolved exactly once.
    async fn perform(&mut self, action: Action, model: ModelHandle, reply: Completion) {
        let mut backoff = self.ctx.retry().backoff();
        let mut reply = reply;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let err = match self.submit(&action, &model, reply).await {
                Ok(()) => return,
                Err((err, returned)) => {
                    reply = returned;
                    err
                },
            };

            if !err.is_transient() {
                tracing::error!("'{}' failed: {}", action.name(), err);
                let _ = reply.send(Err(err));
                return;
            }
            if !self.ctx.retry().may_resend(attempts) {
                tracing::error!(
                    "'{}' failed after {} attempt(s): {}",
                    action.name(),
                    attempts,
                    err
                );
                let _ = reply.send(Err(IinkError::SendFailed {
                    attempts,
                    source: Box::new(err),
                }));
                return;
            }

            let delay = backoff
                .next_backoff()
                .unwrap_or(self.ctx.retry().max_backoff);
            tracing::warn!(
                "'{}' failed ({}), retrying in {:?} ({}/{})",
                action.name(),
                err,
                delay,
                attempts,
                self.ctx.retry().max_send_attempts
            );
            self.events = None;
            tokio::time::sleep(delay).await;
        }
    }

    /// One attempt; hands the completion back on a retryable failure
    async fn submit(
        &mut self,
        action: &Action,
        model: &ModelHandle,
        reply: Completion,
    ) -> std::result::Result<(), (IinkError, Completion)> {
        // the reconnect budget alone bounds handshakes: a failed establish
        // is final for this action
        if self.events.is_none() {
            if let Err(err) = self.establish().await {
                tracing::error!("'{}' failed: {}", action.name(), err);
                let _ = reply.send(Err(err));
                return Ok(());
            }
        }

        let (built, before) = {
            let mut guard = model::lock(model);
            let before = guard.positions;
            match action.build(&mut self.ctx, &mut guard) {
                Ok(built) => (built, before),
                Err(err) => return Err((err, reply)),
            }
        };

        match built {
            Built::Nothing => {
                tracing::debug!("Nothing new to send for '{}'", action.name());
                let _ = reply.send(Ok(Recognized::unclassified(Arc::clone(model))));
                Ok(())
            },
            Built::Uncorrelated(request) => match self.send_request(&request).await {
                Ok(()) => {
                    action.after_send(&mut self.ctx, &mut model::lock(model));
                    let _ = reply.send(Ok(Recognized::unclassified(Arc::clone(model))));
                    Ok(())
                },
                Err(err) => Err((err, reply)),
            },
            Built::Correlated(request) => {
                self.ctx
                    .queue
                    .enqueue(RecognitionContext::new(Arc::clone(model), action.name(), reply));
                match self.send_request(&request).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        if action.advances_positions() {
                            self.restore_positions(model, before);
                        }
                        match self.ctx.queue.retract_latest() {
                            Some(entry) => Err((err, entry.into_parts().1)),
                            None => {
                                tracing::error!("'{}' vanished from the queue", action.name());
                                Ok(())
                            },
                        }
                    },
                }
            },
        }
    }

    fn restore_positions(&mut self, model: &ModelHandle, before: Positions) {
        let mut model = model::lock(model);
        model.positions = before;
        self.ctx.positions = before;
    }
}
