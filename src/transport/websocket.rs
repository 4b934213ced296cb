//! WebSocket transport over `tokio-tungstenite`.
//!
//! The socket is split: the write half stays on the transport, the read half
//! is drained by a reader task that forwards [`TransportEvent`]s.

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{BoxFuture, Transport, TransportEvent, EVENT_CHANNEL_CAPACITY};
use crate::error::{IinkError, Result};

type Writer = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// WebSocket client transport
#[derive(Default)]
pub struct WebSocketTransport {
    writer: Option<Writer>,
    reader: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl WebSocketTransport {
    /// Create a disconnected transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    fn abort_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.abort_reader();
    }
}

async fn forward(
    mut stream: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    events: mpsc::Sender<TransportEvent>,
) {
    while let Some(frame) = stream.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => TransportEvent::Message(text.as_str().to_string()),
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_string()))
                    .unwrap_or((None, String::new()));
                let _ = events.send(TransportEvent::Closed { code, reason }).await;
                return;
            },
            // control frames are answered by tungstenite itself
            Ok(_) => continue,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            },
        };
        if events.send(event).await.is_err() {
            return;
        }
    }
    let _ = events
        .send(TransportEvent::Closed {
            code: None,
            reason: "stream ended".to_string(),
        })
        .await;
}

impl Transport for WebSocketTransport {
    fn connect<'a>(
        &'a mut self,
        url: &'a Url,
    ) -> BoxFuture<'a, Result<mpsc::Receiver<TransportEvent>>> {
        Box::pin(async move {
            self.abort_reader();
            self.writer = None;

            tracing::info!("Connecting to {}", url);
            let (socket, _response) = connect_async(url.as_str()).await?;
            let (writer, reader) = socket.split();

            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            tx.send(TransportEvent::Opened)
                .await
                .map_err(|_| IinkError::Transport("event channel closed".to_string()))?;

            self.writer = Some(writer);
            self.reader = Some(tokio::spawn(forward(reader, tx)));
            Ok(rx)
        })
    }

    fn send(&mut self, message: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let writer = self
                .writer
                .as_mut()
                .ok_or_else(|| IinkError::Transport("not connected".to_string()))?;
            writer.send(Message::Text(message.into())).await?;
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let writer = self.writer.take();
            let result = match writer {
                Some(mut writer) => writer.close().await.map_err(IinkError::from),
                None => Ok(()),
            };
            self.abort_reader();
            result
        })
    }

    fn name(&self) -> &'static str {
        "WebSocket"
    }
}
