use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{error, info, warn};

use super::{board::StatusBoard, periodic::PeriodicTask, pump::StreamPump};
use crate::{
    camera::{
        surface::VideoSurface,
        traits::{CameraBackend, CaptureConstraints},
    },
    channel::{
        policy::StatusPolicy,
        session::{ChannelContext, ChannelSession},
        transport::Transport,
    },
    config::AppConfig,
    core::state::MonitorSnapshot,
};

pub const CAMERA_NOTICE: &str = "Could not access camera. Please check permissions.";

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub endpoint: String,
    pub constraints: CaptureConstraints,
    pub attach_delay: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.status_endpoint.clone(),
            constraints: CaptureConstraints {
                width: config.capture_width,
                height: config.capture_height,
                facing: config.camera_facing,
            },
            attach_delay: config.attach_delay,
        }
    }
}

/// Resources held while recording.
struct ActiveSession {
    pump: StreamPump,
    channel: ChannelSession,
    timers: Vec<PeriodicTask>,
}

impl ActiveSession {
    async fn close(self) {
        for timer in self.timers {
            timer.cancel().await;
        }
        self.channel.close().await;
        self.pump.close().await;
    }
}

/// Task that owns a running session. It closes the session when asked to, or
/// on its own when the camera stream ends, so a dead stream never leaves the
/// monitor looking like it is recording.
struct SessionHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    fn spawn(mut session: ActiveSession, surface: Arc<VideoSurface>, board: StatusBoard) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let stream_ended = tokio::select! {
                biased;
                _ = stop_rx.changed() => false,
                _ = session.pump.finished() => true,
            };
            session.close().await;
            if stream_ended {
                warn!("camera stream ended while recording; monitoring stopped");
                release(&surface, &board, None);
            }
        });
        Self { stop_tx, task }
    }

    fn signal(&self) {
        let _ = self.stop_tx.send(true);
    }

    async fn close(self) {
        self.signal();
        if let Err(err) = self.task.await {
            warn!("monitor session ended abnormally: {err}");
        }
    }
}

/// Leaves the monitor showing a stopped camera.
fn release(surface: &VideoSurface, board: &StatusBoard, notice: Option<String>) {
    surface.detach();
    board.reset(notice);
}

pub struct MonitorService<B: CameraBackend> {
    backend: B,
    transport: Arc<dyn Transport>,
    policy: Arc<dyn StatusPolicy>,
    surface: Arc<VideoSurface>,
    board: StatusBoard,
    settings: MonitorSettings,
    session: Option<SessionHandle>,
}

impl<B: CameraBackend> MonitorService<B> {
    pub fn new(
        backend: B,
        transport: Arc<dyn Transport>,
        policy: Arc<dyn StatusPolicy>,
        surface: Arc<VideoSurface>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            backend,
            transport,
            policy,
            surface,
            board: StatusBoard::new(),
            settings,
            session: None,
        }
    }

    pub async fn start_camera(&mut self) -> Result<()> {
        if self.is_recording() {
            return Ok(());
        }
        self.reap().await;

        info!("requesting camera access");
        let acquired = self.backend.acquire(&self.settings.constraints).await;
        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(err) => return Err(self.fail_start(err).await),
        };

        // the surface may still be mounting
        sleep(self.settings.attach_delay).await;
        if let Err(err) = self.surface.attach() {
            stream.stop().await;
            return Err(self.fail_start(err).await);
        }

        self.board.begin_recording();
        let pump = StreamPump::spawn(stream, self.surface.clone());
        let channel = ChannelSession::open(ChannelContext {
            transport: self.transport.clone(),
            endpoint: self.settings.endpoint.clone(),
            policy: self.policy.clone(),
            surface: self.surface.clone(),
            board: self.board.clone(),
        });

        let mut timers = Vec::new();
        if let Some(period) = self.policy.local_interval() {
            let policy = self.policy.clone();
            let board = self.board.clone();
            timers.push(PeriodicTask::spawn("status-placeholder", period, move || {
                if let Some(status) = policy.local_status() {
                    board.set_status(status);
                }
            }));
        }

        self.session = Some(SessionHandle::spawn(
            ActiveSession {
                pump,
                channel,
                timers,
            },
            self.surface.clone(),
            self.board.clone(),
        ));
        info!(policy = self.policy.name(), "monitoring started");
        Ok(())
    }

    /// Stops monitoring. Does nothing when already stopped.
    pub async fn stop_camera(&mut self) -> Result<()> {
        if !self.is_recording() {
            self.reap().await;
            return Ok(());
        }
        self.teardown(None).await;
        info!("monitoring stopped");
        Ok(())
    }

    /// Final teardown when the monitor goes away.
    pub async fn shutdown(mut self) {
        if self.is_recording() {
            self.teardown(None).await;
            info!("monitor shut down while recording");
        } else {
            self.reap().await;
        }
    }

    pub fn dismiss_notice(&self) {
        self.board.dismiss_notice();
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.board.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.board.subscribe()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some() && self.board.is_recording()
    }

    pub fn surface(&self) -> &Arc<VideoSurface> {
        &self.surface
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    async fn fail_start(&mut self, err: anyhow::Error) -> anyhow::Error {
        error!("error accessing camera: {err:#}");
        self.teardown(Some(CAMERA_NOTICE.to_string())).await;
        err.context("could not access camera")
    }

    /// The one exit path for stop, failed start and shutdown. A stream that
    /// ends by itself goes through the same `release` from its session task.
    async fn teardown(&mut self, notice: Option<String>) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        release(&self.surface, &self.board, notice);
    }

    /// Collects a session whose stream already ended. Its task has already
    /// reset the board.
    async fn reap(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

impl<B: CameraBackend> Drop for MonitorService<B> {
    fn drop(&mut self) {
        // no runtime to await on here; the tasks finish releasing on their own
        if let Some(session) = self.session.take() {
            session.signal();
            self.board.reset(None);
        }
    }
}
