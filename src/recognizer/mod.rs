//! Recognizer handle.
//!
//! [`Recognizer::spawn`] starts one task per recognition session and returns
//! a cloneable handle. Every action returns a [`Pending`] future right away;
//! it resolves when the matching result is dispatched, when the action fails
//! for good, or when the connection goes away.
//!
//! # Usage
//!
//! ```rust,ignore
//! use iink::{Config, Model, Recognizer, WebSocketTransport};
//!
//! let recognizer = Recognizer::spawn(Config::from_env(), WebSocketTransport::new())?;
//! let model = Model::new().into_handle();
//! recognizer.init(&model).await?;
//! recognizer.new_content_part(&model).await?;
//! // ...capture strokes into `model`...
//! let outcome = recognizer.add_strokes(&model).await?;
//! ```

mod action;
mod task;

pub use action::Action;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::codec::{PenStyle, Theme};
use crate::config::Config;
use crate::error::{IinkError, Result};
use crate::model::{ModelHandle, Recognized};
use crate::protocol::{Ready, RecognizerContext};
use crate::transport::Transport;
use task::{Command, RecognizerTask};

/// Outcome of an action, resolved by the recognizer task
#[derive(Debug)]
#[must_use = "an action resolves only when awaited"]
pub struct Pending {
    rx: oneshot::Receiver<Result<Recognized>>,
}

impl Future for Pending {
    type Output = Result<Recognized>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|_| Err(IinkError::RecognizerStopped)))
    }
}

/// Handle to a running recognizer task
#[derive(Debug, Clone)]
pub struct Recognizer {
    id: Uuid,
    commands: mpsc::UnboundedSender<Command>,
}

impl Recognizer {
    /// Validate `config` and start the recognizer task.
    ///
    /// Must be called from within a tokio runtime. The task stops on
    /// [`close`](Self::close) or once every handle is dropped.
    pub fn spawn<T>(config: Config, transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        config.validate()?;
        let ctx = RecognizerContext::new(Arc::new(config));
        let id = ctx.id();
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(RecognizerTask::new(ctx, transport, rx).run());
        Ok(Self { id, commands })
    }

    /// Local context id (also the `id` of the task's tracing span)
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Connect and run the handshake.
    ///
    /// Resolves with [`Ready::InitDone`] ("Init done") for the challenge
    /// variant and [`Ready::SessionOpened`] for the content package variant.
    pub async fn init(&self, model: &ModelHandle) -> Result<Ready> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Init {
                model: Arc::clone(model),
                reply,
            })
            .map_err(|_| IinkError::RecognizerStopped)?;
        rx.await.map_err(|_| IinkError::RecognizerStopped)?
    }

    /// Queue an action for `model`
    pub fn act(&self, action: Action, model: &ModelHandle) -> Pending {
        let (reply, rx) = oneshot::channel();
        let command = Command::Act {
            action,
            model: Arc::clone(model),
            reply,
        };
        if self.commands.send(command).is_err() {
            tracing::debug!("Recognizer {} already stopped", self.id);
        }
        Pending { rx }
    }

    /// Create a content part of the configured type
    pub fn new_content_part(&self, model: &ModelHandle) -> Pending {
        self.act(Action::NewContentPart, model)
    }

    /// Open an existing content part
    pub fn open_content_part(&self, model: &ModelHandle, part_id: impl Into<String>) -> Pending {
        self.act(
            Action::OpenContentPart {
                part_id: part_id.into(),
            },
            model,
        )
    }

    /// Send the configured server profile
    pub fn configure(&self, model: &ModelHandle) -> Pending {
        self.act(Action::Configure, model)
    }

    /// Send strokes captured since the last batch.
    ///
    /// Resolves immediately, without any traffic, when nothing is new.
    pub fn add_strokes(&self, model: &ModelHandle) -> Pending {
        self.act(Action::AddStrokes, model)
    }

    /// Undo
    pub fn undo(&self, model: &ModelHandle) -> Pending {
        self.act(Action::Undo, model)
    }

    /// Redo
    pub fn redo(&self, model: &ModelHandle) -> Pending {
        self.act(Action::Redo, model)
    }

    /// Clear the document
    pub fn clear(&self, model: &ModelHandle) -> Pending {
        self.act(Action::Clear, model)
    }

    /// Convert ink to typeset content
    pub fn convert(&self, model: &ModelHandle) -> Pending {
        self.act(Action::Convert, model)
    }

    /// Request exports for the active part
    pub fn export_content(&self, model: &ModelHandle) -> Pending {
        self.act(Action::Export, model)
    }

    /// Import `data` into the active part
    pub fn import_content(
        &self,
        model: &ModelHandle,
        mimetype: impl Into<String>,
        data: impl Into<String>,
    ) -> Pending {
        self.act(
            Action::Import {
                mimetype: mimetype.into(),
                data: data.into(),
            },
            model,
        )
    }

    /// Wait until the server is idle
    pub fn wait_for_idle(&self, model: &ModelHandle) -> Pending {
        self.act(Action::WaitForIdle, model)
    }

    /// Canvas resized
    pub fn resize(&self, model: &ModelHandle, width: u32, height: u32) -> Pending {
        self.act(Action::Resize { width, height }, model)
    }

    /// Zoom
    pub fn zoom(&self, model: &ModelHandle, value: f64) -> Pending {
        self.act(Action::Zoom(value), model)
    }

    /// Pen style; `None` resets it
    pub fn set_pen_style(&self, model: &ModelHandle, style: Option<PenStyle>) -> Pending {
        self.act(Action::SetPenStyle(style), model)
    }

    /// Theme
    pub fn set_theme(&self, model: &ModelHandle, theme: Theme) -> Pending {
        self.act(Action::SetTheme(theme), model)
    }

    /// Fail pending actions and close the connection
    pub async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Close { reply })
            .map_err(|_| IinkError::RecognizerStopped)?;
        rx.await.map_err(|_| IinkError::RecognizerStopped)?
    }
}
