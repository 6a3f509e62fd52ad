use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, bail};

use crate::camera::traits::Facing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    StatusPush,
    LocalRandom,
}

impl FromStr for PolicyKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status-push" | "push" => Ok(PolicyKind::StatusPush),
            "local-random" | "random" => Ok(PolicyKind::LocalRandom),
            other => bail!("unknown status policy: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub status_endpoint: String,
    pub status_policy: PolicyKind,
    pub camera_device: String,
    pub camera_input_format: String,
    pub camera_facing: Facing,
    pub capture_width: u32,
    pub capture_height: u32,
    pub frame_interval: Duration,
    pub random_status_interval: Duration,
    pub attach_delay: Duration,
    pub jpeg_quality: f32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name =
            env::var("APP_NAME").unwrap_or_else(|_| "Sleep Detection Monitor".to_owned());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_owned())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let status_endpoint =
            env::var("STATUS_ENDPOINT").unwrap_or_else(|_| "ws://localhost:8000/ws".to_owned());
        let status_policy = env::var("STATUS_POLICY")
            .unwrap_or_else(|_| "status-push".to_owned())
            .parse()?;

        let camera_device = env::var("CAMERA_DEVICE").unwrap_or_else(|_| "/dev/video0".to_owned());
        let camera_input_format =
            env::var("CAMERA_INPUT_FORMAT").unwrap_or_else(|_| "mjpeg".to_owned());
        let camera_facing = env::var("CAMERA_FACING")
            .unwrap_or_else(|_| "user".to_owned())
            .parse()?;

        let jpeg_quality = parsed_or("JPEG_QUALITY", 0.8_f32);
        if !(0.0..=1.0).contains(&jpeg_quality) {
            bail!("JPEG_QUALITY must be between 0.0 and 1.0, got {jpeg_quality}");
        }

        Ok(Self {
            app_name,
            bind_addr,
            status_endpoint,
            status_policy,
            camera_device,
            camera_input_format,
            camera_facing,
            capture_width: parsed_or("CAPTURE_WIDTH", 1280),
            capture_height: parsed_or("CAPTURE_HEIGHT", 720),
            frame_interval: period_ms("FRAME_INTERVAL_MS", 100)?,
            random_status_interval: period_ms("RANDOM_STATUS_INTERVAL_MS", 3000)?,
            attach_delay: Duration::from_millis(parsed_or("ATTACH_DELAY_MS", 100)),
            jpeg_quality,
        })
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Timer periods must be positive; a zero period would stall its timer.
fn period_ms(key: &str, default: u64) -> anyhow::Result<Duration> {
    let millis = parsed_or(key, default);
    if millis == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::PathBuf,
        sync::{Mutex, OnceLock},
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use super::{AppConfig, PolicyKind};
    use crate::camera::traits::Facing;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_all() {
        for key in [
            "BIND_ADDR",
            "STATUS_ENDPOINT",
            "STATUS_POLICY",
            "FRAME_INTERVAL_MS",
            "RANDOM_STATUS_INTERVAL_MS",
            "ATTACH_DELAY_MS",
            "JPEG_QUALITY",
            "CAMERA_FACING",
        ] {
            remove_env(key);
        }
    }

    #[test]
    fn from_env_uses_defaults() {
        let _guard = lock_env();
        clear_all();

        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.status_endpoint, "ws://localhost:8000/ws");
        assert_eq!(config.status_policy, PolicyKind::StatusPush);
        assert_eq!(config.frame_interval, Duration::from_millis(100));
        assert_eq!(config.random_status_interval, Duration::from_secs(3));
        assert_eq!(config.attach_delay, Duration::from_millis(100));
        assert!((config.jpeg_quality - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn from_env_selects_random_policy() {
        let _guard = lock_env();
        clear_all();
        set_env("STATUS_POLICY", "local-random");

        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.status_policy, PolicyKind::LocalRandom);
        remove_env("STATUS_POLICY");
    }

    #[test]
    fn from_env_rejects_unknown_policy() {
        let _guard = lock_env();
        clear_all();
        set_env("STATUS_POLICY", "telepathy");

        let err = AppConfig::from_env().expect_err("policy should be rejected");
        assert!(err.to_string().contains("unknown status policy"));
        remove_env("STATUS_POLICY");
    }

    #[test]
    fn from_env_reads_camera_facing() {
        let _guard = lock_env();
        clear_all();
        assert_eq!(
            AppConfig::from_env().expect("config should parse").camera_facing,
            Facing::User
        );

        set_env("CAMERA_FACING", "environment");
        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.camera_facing, Facing::Environment);

        set_env("CAMERA_FACING", "sideways");
        assert!(AppConfig::from_env().is_err());
        remove_env("CAMERA_FACING");
    }

    #[test]
    fn unparsable_interval_falls_back_to_default() {
        let _guard = lock_env();
        clear_all();
        set_env("FRAME_INTERVAL_MS", "fast");

        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.frame_interval, Duration::from_millis(100));
        remove_env("FRAME_INTERVAL_MS");
    }

    #[test]
    fn zero_timer_periods_are_rejected() {
        let _guard = lock_env();
        clear_all();

        for key in ["FRAME_INTERVAL_MS", "RANDOM_STATUS_INTERVAL_MS"] {
            set_env(key, "0");
            let err = AppConfig::from_env().expect_err("zero period should be rejected");
            assert!(err.to_string().contains(key), "unexpected error: {err}");
            remove_env(key);
        }

        set_env("FRAME_INTERVAL_MS", "250");
        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.frame_interval, Duration::from_millis(250));
        remove_env("FRAME_INTERVAL_MS");
    }

    #[test]
    fn from_env_reads_endpoint_from_dotenv_file() {
        let _guard = lock_env();
        clear_all();

        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let path: PathBuf = std::env::temp_dir().join(format!("sleepwatch-dotenv-{suffix}.env"));
        fs::write(&path, "STATUS_ENDPOINT=ws://127.0.0.1:9000/ws\n")
            .expect("should write temporary dotenv file");

        dotenvy::from_path_override(&path).expect("dotenv file should load");
        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.status_endpoint, "ws://127.0.0.1:9000/ws");

        remove_env("STATUS_ENDPOINT");
        let _ = fs::remove_file(path);
    }
}
