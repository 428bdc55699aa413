//! API error handling
//!
//! Every failure leaves as `{"error": <code>, "message": <text>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sd_core::error::SdError;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    /// A failure reported by the workflow services
    Service(SdError),
    /// Missing or malformed actor headers
    Unauthorized(String),
    /// The actor may not use this endpoint
    Forbidden(String),
    /// The request could not be read (bad multipart, bad JSON part)
    BadRequest(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Service(e) => e.error_code(),
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Service(SdError::Validation(errors)) => errors.full_messages().join(", "),
            ApiError::Service(e) => e.to_string(),
            ApiError::Unauthorized(msg) | ApiError::Forbidden(msg) | ApiError::BadRequest(msg) => {
                msg.clone()
            }
        }
    }
}

impl From<SdError> for ApiError {
    fn from(err: SdError) -> Self {
        ApiError::Service(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), code = self.error_code(), "Request failed");
        }
        let body = ErrorBody {
            error: self.error_code(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
