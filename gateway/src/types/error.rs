//! Universal error handling for the API (spec §7).

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use pubsub_broker::BrokerError;
use pubsub_store::StoreError;

/// Error envelope wire format: `{"error":{"code":<int>,"message":"...","status":"..."}}`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiErrorResponse {
    pub error: ErrorBody,
}

/// Error body carrying the numeric status, a machine-readable status name, and a
/// human-readable message.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub status: &'static str,
}

/// Application error type; maps every domain error kind to an HTTP status and the
/// `{error: {...}}` envelope.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    status_name: &'static str,
    message: String,
}

impl AppError {
    #[must_use]
    pub fn new(status: StatusCode, status_name: &'static str, message: impl Into<String>) -> Self {
        Self { status, status_name, message: message.into() }
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "invalid or unknown token")
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", "caller is not authorized for this route")
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status.as_u16() {
            400..=499 => tracing::warn!(status = %self.status, message = %self.message, "client error"),
            500..=599 => tracing::error!(status = %self.status, message = %self.message, "server error"),
            _ => {}
        }

        let body = ApiErrorResponse {
            error: ErrorBody {
                code: self.status.as_u16(),
                message: self.message,
                status: self.status_name,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Maps `StoreError` to the HTTP statuses spec §7/§8 scenarios specify:
/// `NoAckPending`/`WrongAck` are 400, `AckTimeout` is 408, `Exists` is 409.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::not_found(what),
            StoreError::Exists(what) => Self::new(StatusCode::CONFLICT, "ALREADY_EXISTS", what),
            StoreError::NoAckPending => Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", "no ack pending"),
            StoreError::WrongAck => Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", "wrong ack"),
            StoreError::AckTimeout => Self::new(StatusCode::REQUEST_TIMEOUT, "TIMEOUT", "ack timeout"),
        }
    }
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::PayloadTooLarge => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "BAD_REQUEST", "payload too large")
            }
            BrokerError::Broker(msg) => Self::internal(msg),
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
