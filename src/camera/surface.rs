use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use bytes::Bytes;
use tokio::sync::watch;

/// Where the live preview is shown. The web UI mounts it on startup; a stream
/// can only be attached while it is mounted.
pub struct VideoSurface {
    mounted: AtomicBool,
    attached: AtomicBool,
    frame_tx: watch::Sender<Option<Bytes>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        let (frame_tx, _) = watch::channel(None);
        Self {
            mounted: AtomicBool::new(false),
            attached: AtomicBool::new(false),
            frame_tx,
        }
    }

    pub fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.detach();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn attach(&self) -> Result<()> {
        if !self.is_mounted() {
            bail!("video surface is not mounted");
        }
        self.attached.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.frame_tx.send_replace(None);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Shows a frame. Frames arriving while detached are dropped.
    pub fn present(&self, frame: Bytes) {
        if self.is_attached() {
            self.frame_tx.send_replace(Some(frame));
        }
    }

    /// The frame currently on screen, if any.
    pub fn capture(&self) -> Option<Bytes> {
        self.frame_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Bytes>> {
        self.frame_tx.subscribe()
    }
}

impl Default for VideoSurface {
    fn default() -> Self {
        Self::new()
    }
}
