use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

#[derive(Debug)]
enum ErrorBody {
    Text(String),
    /// A full page, for form posts that expect HTML back.
    Page(String),
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody::Text(message.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::Text(message.into()),
        }
    }

    /// The camera could not be acquired. `page` is the monitor page, already
    /// showing the failure notice.
    pub fn camera_unavailable(page: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::Page(page),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(format!("{value:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.body {
            ErrorBody::Text(message) => (status, message).into_response(),
            ErrorBody::Page(html) => (status, Html(html)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::to_bytes,
        http::{StatusCode, header::CONTENT_TYPE},
        response::IntoResponse,
    };

    use super::AppError;

    #[tokio::test]
    async fn camera_failure_renders_page_as_bad_request() {
        let response = AppError::camera_unavailable("<p>notice</p>".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        assert_eq!(body.as_ref(), b"<p>notice</p>");
    }

    #[test]
    fn anyhow_errors_keep_their_context_chain() {
        let err = anyhow::anyhow!("device busy").context("could not access camera");
        let app: AppError = err.into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(format!("{:?}", app).contains("could not access camera: device busy"));
    }
}
