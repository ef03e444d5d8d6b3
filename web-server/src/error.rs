// web-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use roadnet_common::{ConfigurationError, Envelope};
use thiserror::Error;

/// Failures raised by the gateway before or while talking to the backend.
/// Non-success backend statuses are relayed, not raised.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Authorization header is required")]
    MissingAuthorization,

    #[error("Backend service is unreachable")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to read backend response")]
    UpstreamBody(#[source] reqwest::Error),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    Payload(String),
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::MissingAuthorization => StatusCode::UNAUTHORIZED,
            GatewayError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Payload(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(Envelope::error(self.to_string()))
    }
}

/// Failures of the crack-detection demo
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Missing required field: image")]
    MissingImage,

    #[error("Image is not valid base64")]
    InvalidImage,

    #[error("Detection result not found")]
    NotFound,

    #[error("Upload exceeds {0} bytes")]
    UploadTooLarge(usize),

    #[error("Failed to read upload: {0}")]
    Upload(String),

    #[error("Detection store unavailable: {0}")]
    Registry(#[from] actix::MailboxError),
}

impl ResponseError for DetectionError {
    fn status_code(&self) -> StatusCode {
        match self {
            DetectionError::MissingImage | DetectionError::InvalidImage | DetectionError::Upload(_) => {
                StatusCode::BAD_REQUEST
            },
            DetectionError::NotFound => StatusCode::NOT_FOUND,
            DetectionError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DetectionError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(Envelope::error(self.to_string()))
    }
}
