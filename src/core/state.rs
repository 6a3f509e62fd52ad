use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SleepStatus {
    Awake,
    Sleeping,
    NoFaceDetected,
    #[default]
    CameraOff,
}

impl SleepStatus {
    /// The three states a running monitor can report.
    pub const ACTIVE: [SleepStatus; 3] = [
        SleepStatus::Awake,
        SleepStatus::Sleeping,
        SleepStatus::NoFaceDetected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SleepStatus::Awake => "Awake",
            SleepStatus::Sleeping => "Sleeping",
            SleepStatus::NoFaceDetected => "No Face Detected",
            SleepStatus::CameraOff => "Camera Off",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            SleepStatus::Awake => "green",
            SleepStatus::Sleeping => "red",
            SleepStatus::NoFaceDetected => "yellow",
            SleepStatus::CameraOff => "gray",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    pub recording: bool,
    pub connected: bool,
    pub status: SleepStatus,
    pub notice: Option<String>,
}
