use std::{sync::Mutex, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, error, warn};

use super::protocol::{InboundMessage, parse_inbound};
use crate::{
    config::{AppConfig, PolicyKind},
    core::state::SleepStatus,
};

/// Decides where the displayed status comes from during a recording session.
pub trait StatusPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text sent once right after the channel opens.
    fn handshake(&self) -> Option<&str> {
        None
    }

    /// Cadence at which preview frames are forwarded over the channel.
    fn frame_interval(&self) -> Option<Duration> {
        None
    }

    /// Interprets one inbound text message. `None` leaves the status as is.
    fn on_message(&self, text: &str) -> Option<SleepStatus>;

    /// Cadence of locally generated statuses, independent of the channel.
    fn local_interval(&self) -> Option<Duration> {
        None
    }

    fn local_status(&self) -> Option<SleepStatus> {
        None
    }
}

/// Status is whatever the remote service pushes; frames are streamed to it.
pub struct StatusPush {
    handshake: String,
    frame_interval: Duration,
}

impl StatusPush {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            handshake: "Frontend connected!".to_string(),
            frame_interval,
        }
    }
}

impl StatusPolicy for StatusPush {
    fn name(&self) -> &'static str {
        "status-push"
    }

    fn handshake(&self) -> Option<&str> {
        Some(&self.handshake)
    }

    fn frame_interval(&self) -> Option<Duration> {
        Some(self.frame_interval)
    }

    fn on_message(&self, text: &str) -> Option<SleepStatus> {
        match parse_inbound(text) {
            Ok(InboundMessage::Status { status }) => {
                debug!(?status, "status update from service");
                Some(status)
            }
            Ok(InboundMessage::Error { message }) => {
                error!("status service reported an error: {message}");
                None
            }
            Err(err) => {
                warn!("dropping unparsable status message: {err}");
                None
            }
        }
    }
}

/// Placeholder mode: the channel is opened but ignored, and the status is
/// drawn uniformly from the active states on a fixed timer.
pub struct LocalRandom {
    interval: Duration,
    rng: Mutex<StdRng>,
}

impl LocalRandom {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[cfg(test)]
    pub fn with_seed(interval: Duration, seed: u64) -> Self {
        Self {
            interval,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl StatusPolicy for LocalRandom {
    fn name(&self) -> &'static str {
        "local-random"
    }

    fn on_message(&self, _text: &str) -> Option<SleepStatus> {
        None
    }

    fn local_interval(&self) -> Option<Duration> {
        Some(self.interval)
    }

    fn local_status(&self) -> Option<SleepStatus> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = rng.gen_range(0..SleepStatus::ACTIVE.len());
        Some(SleepStatus::ACTIVE[index])
    }
}

pub fn from_config(config: &AppConfig) -> Box<dyn StatusPolicy> {
    match config.status_policy {
        PolicyKind::StatusPush => Box::new(StatusPush::new(config.frame_interval)),
        PolicyKind::LocalRandom => Box::new(LocalRandom::new(config.random_status_interval)),
    }
}
