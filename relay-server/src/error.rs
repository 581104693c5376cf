use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_shared::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Terminal failure outcomes of a relayed chat call.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Body was not JSON or had no `messages` key. Raised before any
    /// upstream call.
    #[error("No messages provided")]
    InvalidRequest,

    /// Upstream answered with something other than 200.
    #[error("Groq API error: {}", .status.as_u16())]
    UpstreamError { status: StatusCode, body: String },

    /// Transport, decoding or serialization failure.
    #[error("Server error: {0}")]
    InternalError(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::UpstreamError { status, .. } => *status,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        match self {
            Self::UpstreamError { body, .. } => ErrorResponse::with_details(self.to_string(), body),
            _ => ErrorResponse::new(self.to_string()),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest's Display stops at the outermost layer; keep the cause chain.
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::InternalError(message)
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        Self::InternalError(e.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let Self::InternalError(message) = &self {
            error!("Relay failed: {}", message);
        }
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
