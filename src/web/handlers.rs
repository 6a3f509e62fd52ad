use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::{info, warn};

use super::render;
use crate::{
    app_state::AppState,
    core::{errors::AppError, state::MonitorSnapshot},
};

const PREVIEW_BOUNDARY: &str = "sleepwatch";

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    policy: &'static str,
    monitor: MonitorSnapshot,
}

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render::page(&state.config.app_name, &state.snapshot()))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        policy: state.policy_name(),
        monitor: state.snapshot(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render::status_badge(state.snapshot().status))
}

pub async fn start(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    let result = {
        let mut monitor = state.monitor.lock().await;
        monitor.start_camera().await
    };
    match result {
        Ok(()) => {
            info!("camera start requested");
            Ok(Redirect::to("/"))
        }
        Err(err) => {
            warn!("camera start failed: {err:#}");
            Err(AppError::camera_unavailable(render::page(
                &state.config.app_name,
                &state.snapshot(),
            )))
        }
    }
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    {
        let mut monitor = state.monitor.lock().await;
        monitor.stop_camera().await?;
    }
    info!("camera stop requested");
    Ok(Redirect::to("/"))
}

pub async fn dismiss_notice(State(state): State<Arc<AppState>>) -> Redirect {
    state.monitor.lock().await.dismiss_notice();
    Redirect::to("/")
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let frame = state
        .surface()
        .capture()
        .ok_or_else(|| AppError::not_found("no frame on screen; start the camera first"))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((StatusCode::OK, headers, frame).into_response())
}

pub async fn preview(State(state): State<Arc<AppState>>) -> Response {
    let parts = WatchStream::new(state.surface().subscribe())
        .filter_map(|frame| frame)
        .map(|jpeg| Ok::<_, Infallible>(multipart_part(&jpeg)));

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("multipart/x-mixed-replace; boundary=sleepwatch"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    (StatusCode::OK, headers, Body::from_stream(parts)).into_response()
}

fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "--{PREVIEW_BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}
