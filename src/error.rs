use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// The backend (or the proxy, seen from a page) answered with a non-2xx status.
    #[error("{error}")]
    Upstream {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Message for the `error` field of the JSON envelope.
    fn envelope_error(&self) -> String {
        match self {
            AppError::Request(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Url(_)
            | AppError::Json(_)
            | AppError::Multipart(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn envelope_details(&self) -> Option<String> {
        match self {
            AppError::Upstream { details, .. } => details.clone(),
            AppError::Request(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Url(_)
            | AppError::Json(_)
            | AppError::Multipart(_) => Some(self.to_string()),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.envelope_error(),
        });
        if let Some(details) = self.envelope_details() {
            body["details"] = serde_json::Value::String(details);
        }
        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Image(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Multipart(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
