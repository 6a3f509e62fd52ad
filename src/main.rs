mod app_state;
mod camera;
mod channel;
mod config;
mod core;
mod monitor;
mod web;

use std::{future::IntoFuture, sync::Arc};

use app_state::AppState;
use camera::{ffmpeg_backend::FfmpegBackend, surface::VideoSurface};
use channel::{policy, transport::WsTransport};
use config::AppConfig;
use monitor::service::{MonitorService, MonitorSettings};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if std::env::args().any(|arg| arg == "--probe-cameras") {
        let devices = camera::discovery::probe_devices().await?;
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    tokio::fs::create_dir_all("logs").await?;
    let file_appender = rolling::daily("logs", "sleepwatch.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sleepwatch=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let backend = FfmpegBackend::new(
        config.camera_device.clone(),
        config.camera_input_format.clone(),
        config.jpeg_quality,
    );
    let surface = Arc::new(VideoSurface::new());
    let monitor = MonitorService::new(
        backend,
        Arc::new(WsTransport),
        Arc::from(policy::from_config(&config)),
        surface.clone(),
        MonitorSettings::from_config(&config),
    );
    let state = Arc::new(AppState::new(config.clone(), monitor));
    let app = web::routes::build_router(state.clone());
    surface.mount();

    info!(
        "{} listening on {} (device: {}, status endpoint: {}, policy: {})",
        config.app_name,
        config.bind_addr,
        config.camera_device,
        config.status_endpoint,
        state.policy_name()
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    // preview streams never finish on their own, so no graceful drain here
    tokio::select! {
        served = axum::serve(listener, app).into_future() => served?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                error!("failed to listen for shutdown signal: {err}");
            }
        }
    }

    info!("shutting down");
    surface.unmount();
    match Arc::try_unwrap(state) {
        Ok(state) => state.monitor.into_inner().shutdown().await,
        Err(state) => state.monitor.lock().await.stop_camera().await?,
    }

    Ok(())
}
