use http::StatusCode;
use thiserror::Error;
use worker::Error as WorkerError;

use crate::envelope::GatewayResponse;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("upstream API error: {status} {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("upstream API unreachable: {0}")]
    UpstreamTransport(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // The upstream's own status is reported in the message only.
            AppError::UpstreamStatus { .. }
            | AppError::UpstreamTransport(_)
            | AppError::Internal(_)
            | AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamStatus { .. } | AppError::UpstreamTransport(_)
        )
    }

    /// Renders the error as a JSON envelope: `{"error": ..., "details"?: ...}`.
    pub fn to_response(&self) -> GatewayResponse {
        let status = self.status_code();
        match self {
            AppError::NotFound(message) => GatewayResponse::error(status, message, None),
            AppError::BadRequest(message) => {
                GatewayResponse::error(status, "bad request", Some(message))
            }
            AppError::UpstreamStatus { .. } | AppError::UpstreamTransport(_) => {
                GatewayResponse::error(status, "request processing failed", Some(&self.to_string()))
            }
            AppError::Internal(message) => {
                GatewayResponse::error(status, "internal server error", Some(message))
            }
            AppError::Worker(e) => {
                GatewayResponse::error(status, "internal server error", Some(&e.to_string()))
            }
        }
    }
}
