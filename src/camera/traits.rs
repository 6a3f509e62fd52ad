use std::str::FromStr;

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    User,
    Environment,
}

impl FromStr for Facing {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(Facing::User),
            "environment" | "back" => Ok(Facing::Environment),
            other => bail!("unknown camera facing: {other}"),
        }
    }
}

/// Preferred capture settings. Backends treat them as ideals, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing: Facing::User,
        }
    }
}

#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Requests a video-only stream. Fails on permission or device errors.
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<Box<dyn MediaStream>>;
}

#[async_trait]
pub trait MediaStream: Send {
    /// Next JPEG frame, or `None` once the stream has ended.
    async fn next_frame(&mut self) -> Result<Option<Bytes>>;

    /// Stops every track. Calling it again is a no-op.
    async fn stop(&mut self);
}
