use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};

use crate::camera::{surface::VideoSurface, traits::MediaStream};

/// Owns the media stream once it is attached and copies its frames onto the
/// surface. The stream's tracks are stopped exactly once, when the pump ends.
pub struct StreamPump {
    cancel_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    handle: JoinHandle<()>,
}

impl StreamPump {
    pub fn spawn(mut stream: Box<dyn MediaStream>, surface: Arc<VideoSurface>) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    next = stream.next_frame() => match next {
                        Ok(Some(frame)) => surface.present(frame),
                        Ok(None) => {
                            warn!("camera stream ended");
                            break;
                        }
                        Err(err) => {
                            warn!("camera stream failed: {err:#}");
                            break;
                        }
                    },
                }
            }

            stream.stop().await;
            surface.detach();
            info!("camera stream released");
            let _ = done_tx.send(true);
        });

        Self {
            cancel_tx,
            done_rx,
            handle,
        }
    }

    /// Resolves once the stream has been released, whether it was cancelled
    /// or ran out by itself.
    pub async fn finished(&mut self) {
        let _ = self.done_rx.wait_for(|done| *done).await;
    }

    pub fn signal(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub async fn close(self) {
        self.signal();
        if let Err(err) = self.handle.await {
            warn!("camera pump ended abnormally: {err}");
        }
    }
}
