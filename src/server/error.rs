//! Mapping of core errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::CsrKitError;

/// An error leaving a handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CsrKitError> for ApiError {
    fn from(err: CsrKitError) -> Self {
        match err {
            CsrKitError::InvalidSubject(_)
            | CsrKitError::UnsupportedKeySize(_)
            | CsrKitError::UnsupportedKeyType(_)
            | CsrKitError::MalformedInput(_) => ApiError::bad_request(err.to_string()),
            CsrKitError::SignatureVerification(reason) => {
                ApiError::bad_request(format!("CSR signature does not verify: {reason}"))
            }
            CsrKitError::KeyGeneration(_) | CsrKitError::EncodingError(_) => {
                tracing::error!(error = %err, "credential generation failed");
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (CsrKitError::InvalidSubject("x".into()), StatusCode::BAD_REQUEST),
            (CsrKitError::UnsupportedKeySize(1024), StatusCode::BAD_REQUEST),
            (CsrKitError::UnsupportedKeyType("dsa".into()), StatusCode::BAD_REQUEST),
            (CsrKitError::MalformedInput("x".into()), StatusCode::BAD_REQUEST),
            (CsrKitError::SignatureVerification("x".into()), StatusCode::BAD_REQUEST),
            (CsrKitError::KeyGeneration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CsrKitError::EncodingError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
