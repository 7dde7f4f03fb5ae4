//! Error taxonomy at the dispatcher boundary and its mapping to responses.

use serde::Serialize;

use crate::api::pagination::PaginationError;
use crate::http::response::{Response, StatusCode};
use crate::proxy::upstream::UpstreamError;

/// JSON body returned on every failure path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid pagination parameters: {0}")]
    Validation(#[from] PaginationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("malformed request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BadRequest,
            ApiError::Upstream(e) if e.is_communication_failure() => StatusCode::BadGateway,
            ApiError::Upstream(_) => StatusCode::InternalServerError,
            ApiError::NotFound(_) => StatusCode::NotFound,
            ApiError::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
        }
    }

    /// The client-facing body. Upstream details stay in the logs.
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ApiError::Validation(e) => {
                ErrorEnvelope::new("Invalid pagination parameters").with_message(e.to_string())
            }
            ApiError::Upstream(e) if e.is_communication_failure() => {
                ErrorEnvelope::new("External API request failed")
            }
            ApiError::Upstream(_) => ErrorEnvelope::new("Internal server error"),
            ApiError::NotFound(_) => ErrorEnvelope::new("Endpoint not found")
                .with_message("The requested endpoint does not exist"),
            ApiError::MethodNotAllowed { .. } => ErrorEnvelope::new("Method not allowed")
                .with_message("The method is not allowed for the requested URL"),
            ApiError::BadRequest(detail) => ErrorEnvelope::new("Bad request").with_message(detail.clone()),
        }
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::json(self.status(), &self.envelope());
        if let ApiError::MethodNotAllowed { .. } = self {
            response.set_header("Allow", "GET, HEAD, OPTIONS");
        }
        response
    }
}
