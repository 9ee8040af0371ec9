use anyhow::{anyhow, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Thin wrapper splitting a WS connection into independently-lockable
/// halves, so a ping task and a read loop can both hold the client without
/// fighting over one lock.
#[derive(Clone)]
pub struct WsClient {
    url: Arc<String>,
    writer: Arc<Mutex<Option<SplitSink<WsStream, Message>>>>,
    reader: Arc<Mutex<Option<SplitStream<WsStream>>>>,
    connected: Arc<AtomicBool>,
}

impl WsClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Arc::new(url.into()),
            writer: Arc::new(Mutex::new(None)),
            reader: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn connect(&self) -> Result<()> {
        let url = Url::parse(self.url.as_str())?;
        debug!(url = %self.url, "connecting websocket");

        let (stream, response) = connect_async(url).await?;
        debug!(status = %response.status(), "websocket handshake complete");

        let (writer, reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        *self.reader.lock().await = Some(reader);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn send(&self, message: Message) -> Result<()> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => {
                writer.send(message).await?;
                Ok(())
            }
            None => Err(anyhow!("websocket not connected")),
        }
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Message::Text(text.into())).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.send(Message::Ping(Vec::new())).await
    }

    /// Receive the next application frame. Returns `Ok(None)` on a graceful
    /// stream end so the supervisor can distinguish it from a parse error.
    pub async fn next_message(&self) -> Result<Option<Message>> {
        let mut guard = self.reader.lock().await;
        match guard.as_mut() {
            Some(reader) => match reader.next().await {
                Some(Ok(message)) => Ok(Some(message)),
                Some(Err(err)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    Err(err.into())
                }
                None => {
                    self.connected.store(false, Ordering::SeqCst);
                    warn!("websocket stream ended");
                    Ok(None)
                }
            },
            None => Err(anyhow!("websocket not connected")),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        *self.reader.lock().await = None;
        Ok(())
    }
}
