use std::sync::Arc;

use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    policy::StatusPolicy,
    protocol::frame_message,
    transport::{ChannelEvent, Connection, Transport},
};
use crate::{
    camera::surface::VideoSurface,
    monitor::{board::StatusBoard, periodic::PeriodicTask},
};

/// Everything a channel task needs; cloned out of the monitor on start.
pub struct ChannelContext {
    pub transport: Arc<dyn Transport>,
    pub endpoint: String,
    pub policy: Arc<dyn StatusPolicy>,
    pub surface: Arc<VideoSurface>,
    pub board: StatusBoard,
}

/// The single task that owns the status connection for one recording
/// session. Nothing else writes to or closes the socket.
pub struct ChannelSession {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ChannelSession {
    pub fn open(context: ChannelContext) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run(context, cancel_rx));
        Self { cancel_tx, handle }
    }

    pub fn signal(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub async fn close(self) {
        self.signal();
        if let Err(err) = self.handle.await {
            warn!("status channel task ended abnormally: {err}");
        }
    }
}

async fn run(context: ChannelContext, mut cancel_rx: watch::Receiver<bool>) {
    let ChannelContext {
        transport,
        endpoint,
        policy,
        surface,
        board,
    } = context;

    let connection = tokio::select! {
        _ = cancel_rx.changed() => return,
        result = transport.connect(&endpoint) => match result {
            Ok(connection) => connection,
            Err(err) => {
                error!("status channel error: {err:#}");
                board.set_connected(false);
                return;
            }
        },
    };
    let Connection {
        outbound,
        mut inbound,
    } = connection;

    info!(%endpoint, policy = policy.name(), "status channel connected");
    board.set_connected(true);

    if let Some(handshake) = policy.handshake() {
        if outbound.try_send(handshake.to_owned()).is_err() {
            warn!("status channel handshake could not be queued");
        }
    }

    let forwarder = policy.frame_interval().map(|period| {
        let outbound = outbound.clone();
        let surface = surface.clone();
        PeriodicTask::spawn("frame-forwarder", period, move || {
            forward_frame(&surface, &outbound)
        })
    });

    loop {
        tokio::select! {
            _ = cancel_rx.changed() => {
                info!("closing status channel");
                break;
            }
            event = inbound.recv() => match event {
                Some(ChannelEvent::Text(text)) => {
                    if let Some(status) = policy.on_message(&text) {
                        board.set_status(status);
                    }
                }
                Some(ChannelEvent::Error(err)) => {
                    error!("status channel error: {err}");
                    break;
                }
                Some(ChannelEvent::Closed) | None => {
                    info!("status channel disconnected");
                    break;
                }
            },
        }
    }

    if let Some(forwarder) = forwarder {
        forwarder.cancel().await;
    }
    drop(outbound);
    board.set_connected(false);
}

fn forward_frame(surface: &VideoSurface, outbound: &mpsc::Sender<String>) {
    let Some(frame) = surface.capture() else {
        return;
    };
    let message = match frame_message(&frame) {
        Ok(message) => message,
        Err(err) => {
            warn!("failed to encode frame message: {err}");
            return;
        }
    };
    match outbound.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("outbound queue full, frame dropped"),
        Err(TrySendError::Closed(_)) => debug!("channel closed, frame dropped"),
    }
}
