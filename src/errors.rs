use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every non-2xx response.
///
/// Clients only rely on `error`; the other fields help correlate server logs.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error description, surfaced verbatim by clients
    pub error: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

/// Errors raised by the inventory store and the HTTP handlers in front of it.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidOperation(_) | Self::InsufficientStock(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    pub fn response_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::InvalidOperation(msg)
            | Self::InsufficientStock(msg)
            | Self::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(error = %self, status = status.as_u16(), "request rejected");

        let body = ErrorResponse {
            error: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// The ledger operation an out-of-range amount was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LedgerOperation {
    #[strum(serialize = "allocate")]
    Allocate,
    #[strum(serialize = "deallocate")]
    Deallocate,
    #[strum(serialize = "swap")]
    Swap,
}

/// Errors raised on the consuming side of the ledger: validation before a
/// request is sent, transport and HTTP failures, and saga misuse.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid {operation} amount {requested}: maximum is {max}")]
    OutOfRange {
        operation: LedgerOperation,
        requested: i64,
        min: i64,
        max: i64,
    },

    #[error("No lines have anything left to allocate")]
    NothingToAllocate,

    #[error("Operation cancelled before confirmation")]
    Cancelled,

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Alias '{0}' is reported as a duplicate but no group with that name exists")]
    ImpossibleDuplicate(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl LedgerError {
    /// HTTP status of a backend rejection, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT.as_u16())
    }

    /// True when the error was raised locally and nothing reached the backend.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::OutOfRange { .. }
                | Self::NothingToAllocate
                | Self::Cancelled
                | Self::InvalidTransition(_)
        )
    }
}

/// Ledger rules run inside the store reject bad input with a 400.
impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(_) | LedgerError::OutOfRange { .. } => {
                ServiceError::ValidationError(err.to_string())
            }
            other => ServiceError::InvalidOperation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.error, "missing");
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidOperation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn ledger_rule_violations_become_bad_requests() {
        let err: ServiceError = LedgerError::OutOfRange {
            operation: LedgerOperation::Swap,
            requested: 4,
            min: 1,
            max: 3,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.response_message(), "Invalid swap amount 4: maximum is 3");
    }

    #[test]
    fn out_of_range_message_states_maximum() {
        let err = LedgerError::OutOfRange {
            operation: LedgerOperation::Deallocate,
            requested: 9,
            min: 0,
            max: 7,
        };
        assert_eq!(err.to_string(), "Invalid deallocate amount 9: maximum is 7");
        assert!(err.is_client_side());
    }

    #[test]
    fn http_error_exposes_status() {
        let err = LedgerError::Http {
            status: 409,
            message: "duplicate".into(),
        };
        assert!(err.is_conflict());
        assert!(!err.is_client_side());
        assert_eq!(err.to_string(), "duplicate");
    }
}
