use std::{collections::VecDeque, process::Stdio, time::Duration};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::{
    io::AsyncReadExt,
    process::{Child, ChildStdout, Command},
    time::timeout,
};
use tracing::{debug, warn};

use super::{
    jpeg::{JpegSplitter, mjpeg_qscale},
    traits::{CameraBackend, CaptureConstraints, Facing, MediaStream},
};

const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    device: String,
    input_format: String,
    jpeg_quality: f32,
}

impl FfmpegBackend {
    pub fn new(device: String, input_format: String, jpeg_quality: f32) -> Self {
        Self {
            device,
            input_format,
            jpeg_quality,
        }
    }

    fn command(&self, constraints: &CaptureConstraints) -> Command {
        let video_size = format!("{}x{}", constraints.width, constraints.height);
        let qscale = mjpeg_qscale(self.jpeg_quality).to_string();

        let mut command = Command::new("ffmpeg");
        command
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-input_format",
                &self.input_format,
                "-video_size",
                &video_size,
                "-i",
                &self.device,
                "-an",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-q:v",
                &qscale,
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl CameraBackend for FfmpegBackend {
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<Box<dyn MediaStream>> {
        if tokio::fs::metadata(&self.device).await.is_err() {
            bail!("no camera device at {}", self.device);
        }
        if constraints.facing != Facing::User {
            debug!("v4l2 has no facing mode, ignoring {:?}", constraints.facing);
        }

        let mut child = self
            .command(constraints)
            .spawn()
            .context("failed to spawn ffmpeg capture process")?;
        let stdout = child
            .stdout
            .take()
            .context("missing ffmpeg stdout pipe for capture")?;

        let mut stream = FfmpegStream {
            child: Some(child),
            stdout,
            splitter: JpegSplitter::new(),
            pending: VecDeque::new(),
            buffer: vec![0_u8; 64 * 1024],
        };

        // ffmpeg exits right away on permission or busy-device errors; wait for
        // one real frame before handing the stream out.
        match timeout(FIRST_FRAME_TIMEOUT, stream.next_frame()).await {
            Ok(Ok(Some(frame))) => {
                stream.pending.push_front(frame);
                Ok(Box::new(stream))
            }
            Ok(Ok(None)) => {
                stream.stop().await;
                bail!("camera {} closed before producing a frame", self.device)
            }
            Ok(Err(err)) => {
                stream.stop().await;
                Err(err)
            }
            Err(_) => {
                stream.stop().await;
                bail!(
                    "camera {} produced no frame within {}s",
                    self.device,
                    FIRST_FRAME_TIMEOUT.as_secs()
                )
            }
        }
    }
}

pub struct FfmpegStream {
    child: Option<Child>,
    stdout: ChildStdout,
    splitter: JpegSplitter,
    pending: VecDeque<Bytes>,
    buffer: Vec<u8>,
}

#[async_trait]
impl MediaStream for FfmpegStream {
    async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            if self.child.is_none() {
                return Ok(None);
            }

            let n = self
                .stdout
                .read(&mut self.buffer)
                .await
                .context("failed to read ffmpeg capture output")?;
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend(self.splitter.push_chunk(&self.buffer[..n]));
        }
    }

    async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(err) = child.kill().await {
            warn!("failed to kill ffmpeg capture child: {err}");
        }
        if let Err(err) = child.wait().await {
            warn!("failed to wait ffmpeg capture child: {err}");
        }
        self.pending.clear();
    }
}
