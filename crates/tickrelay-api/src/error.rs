//! Maps relay and application errors to HTTP responses.

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use tickrelay_core::error::{AppError, ErrorKind};
use tickrelay_realtime::RelayError;
use tickrelay_realtime::message::tick::EXPECTED_SHAPE;

use crate::dto::response::ErrorResponse;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Errors from the relay engine.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Errors from the shared application layer.
    #[error(transparent)]
    App(#[from] AppError),

    /// The request body could not be read (too large, or the stream broke).
    #[error(transparent)]
    Body(#[from] BytesRejection),

    /// The server is draining connections.
    #[error("server is shutting down")]
    ShuttingDown,
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Relay(err) => err.kind(),
            Self::App(err) => err.kind,
            Self::Body(_) => ErrorKind::Validation,
            Self::ShuttingDown => ErrorKind::ServiceUnavailable,
        }
    }

    /// Client-facing detail, without the internal kind prefix.
    fn detail(&self) -> String {
        match self {
            Self::App(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Relay(RelayError::InvalidPayload { reason, received }) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: reason,
                    message: None,
                    expected: Some(EXPECTED_SHAPE.to_string()),
                    received: Some(received),
                },
            ),
            Self::Relay(RelayError::MalformedEncoding(err)) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Malformed JSON".to_string(),
                    message: Some(err.to_string()),
                    expected: Some(EXPECTED_SHAPE.to_string()),
                    received: Some(Value::Null),
                },
            ),
            Self::Body(rejection) => (
                rejection.status(),
                ErrorResponse {
                    error: match rejection.status() {
                        StatusCode::PAYLOAD_TOO_LARGE => "Payload too large".to_string(),
                        _ => "Bad request".to_string(),
                    },
                    message: Some(rejection.body_text()),
                    expected: Some(EXPECTED_SHAPE.to_string()),
                    received: None,
                },
            ),
            other => {
                let status = status_for(other.kind());
                let error = match status {
                    StatusCode::SERVICE_UNAVAILABLE => "Service unavailable",
                    StatusCode::BAD_REQUEST => "Bad request",
                    StatusCode::CONFLICT => "Conflict",
                    _ => {
                        tracing::error!(error = %other, "Internal server error");
                        "Internal server error"
                    }
                };
                (
                    status,
                    ErrorResponse {
                        error: error.to_string(),
                        message: Some(other.detail()),
                        expected: None,
                        received: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_payload_is_400_with_echo() {
        let err = ApiError::from(RelayError::invalid_payload(
            "Invalid data format",
            json!({"foo": 1}),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid data format");
        assert_eq!(body["expected"], EXPECTED_SHAPE);
        assert_eq!(body["received"], json!({"foo": 1}));
    }

    #[tokio::test]
    async fn test_registry_closed_is_503() {
        let response = ApiError::from(RelayError::RegistryClosed).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"], "Service unavailable");
    }

    #[tokio::test]
    async fn test_internal_app_error_is_500() {
        let response = ApiError::from(AppError::internal("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "boom");
    }

    #[tokio::test]
    async fn test_relay_error_message_is_its_display() {
        let id = tickrelay_core::types::ConnectionId::new();
        let response =
            ApiError::from(RelayError::DuplicateConnection(id)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            format!("connection {id} is already registered")
        );
    }
}
