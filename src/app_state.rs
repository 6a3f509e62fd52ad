use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::{
    camera::{ffmpeg_backend::FfmpegBackend, surface::VideoSurface},
    config::AppConfig,
    core::state::MonitorSnapshot,
    monitor::service::MonitorService,
};

pub type Monitor = MonitorService<FfmpegBackend>;

pub struct AppState {
    pub config: AppConfig,
    pub monitor: Mutex<Monitor>,
    policy_name: &'static str,
    surface: Arc<VideoSurface>,
    snapshots: watch::Receiver<MonitorSnapshot>,
}

impl AppState {
    pub fn new(config: AppConfig, monitor: Monitor) -> Self {
        let surface = monitor.surface().clone();
        let snapshots = monitor.subscribe();
        let policy_name = monitor.policy_name();
        Self {
            config,
            policy_name,
            monitor: Mutex::new(monitor),
            surface,
            snapshots,
        }
    }

    /// Current state without waiting on the monitor lock, which is held for
    /// the whole camera acquisition.
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy_name
    }

    pub fn surface(&self) -> &Arc<VideoSurface> {
        &self.surface
    }
}
