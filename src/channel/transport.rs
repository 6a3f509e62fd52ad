use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// How long the reader waits for the peer to answer our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);
pub const OUTBOUND_QUEUE: usize = 32;
const INBOUND_QUEUE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Text(String),
    Error(String),
    Closed,
}

/// An open duplex connection. Dropping every `outbound` sender closes it.
pub struct Connection {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<ChannelEvent>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Connection>;
}

#[derive(Debug, Clone, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, endpoint: &str) -> Result<Connection> {
        let (socket, _) = timeout(CONNECT_TIMEOUT, connect_async(endpoint))
            .await
            .with_context(|| format!("websocket connect to {endpoint} timed out"))?
            .with_context(|| format!("websocket connect to {endpoint} failed"))?;
        let (mut sink, mut stream) = socket.split();

        let (outbound, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);
        let (closing_tx, mut closing_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(err) = sink.send(Message::Text(text)).await {
                    warn!("websocket send failed: {err}");
                    break;
                }
            }
            let _ = closing_tx.send(());
            if let Err(err) = sink.close().await {
                debug!("websocket close failed: {err}");
            }
        });

        tokio::spawn(async move {
            let mut draining = false;
            loop {
                // once our side has closed, the peer only gets a grace period
                let next = if draining {
                    match timeout(CLOSE_GRACE, stream.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            debug!("peer never answered the close frame");
                            break;
                        }
                    }
                } else {
                    tokio::select! {
                        next = stream.next() => next,
                        _ = &mut closing_rx => {
                            draining = true;
                            continue;
                        }
                    }
                };
                let Some(message) = next else { break };
                let event = match message {
                    Ok(Message::Text(text)) => ChannelEvent::Text(text),
                    Ok(Message::Binary(data)) => {
                        warn!("dropping {} byte binary message", data.len());
                        continue;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        let _ = inbound_tx.send(ChannelEvent::Error(err.to_string())).await;
                        return;
                    }
                };
                if inbound_tx.send(event).await.is_err() {
                    return;
                }
            }
            let _ = inbound_tx.send(ChannelEvent::Closed).await;
        });

        Ok(Connection { outbound, inbound })
    }
}
