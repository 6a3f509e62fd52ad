use std::sync::Arc;

use tokio::sync::watch;

use crate::core::state::{MonitorSnapshot, SleepStatus};

/// Shared, observable monitor state. Background tasks only get to write the
/// status while recording, so a late timer tick or message cannot bring back
/// an active status after a stop.
#[derive(Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<MonitorSnapshot>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(MonitorSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.tx.subscribe()
    }

    pub fn is_recording(&self) -> bool {
        self.tx.borrow().recording
    }

    pub fn begin_recording(&self) {
        self.tx.send_modify(|state| {
            state.recording = true;
            state.connected = false;
            state.status = SleepStatus::Awake;
            state.notice = None;
        });
    }

    /// Returns `false` when the write was dropped because nothing is recording.
    pub fn set_status(&self, status: SleepStatus) -> bool {
        let mut accepted = false;
        self.tx.send_if_modified(|state| {
            if !state.recording {
                return false;
            }
            accepted = true;
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });
        accepted
    }

    pub fn set_connected(&self, connected: bool) {
        self.tx.send_if_modified(|state| {
            let next = connected && state.recording;
            if state.connected == next {
                return false;
            }
            state.connected = next;
            true
        });
    }

    pub fn dismiss_notice(&self) {
        self.tx.send_if_modified(|state| state.notice.take().is_some());
    }

    pub fn reset(&self, notice: Option<String>) {
        self.tx.send_modify(|state| {
            state.recording = false;
            state.connected = false;
            state.status = SleepStatus::CameraOff;
            state.notice = notice;
        });
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
