//! Origin allow-list enforcement.
//!
//! Allow-listed origins get their own value echoed back. Preflight requests
//! from any other origin, or without one, are refused with 403. Simple
//! requests from unlisted origins are served without CORS headers, which
//! leaves the browser to block the response.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::AppState;
use super::error::ApiError;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";
const MAX_AGE_SECS: &str = "600";

pub async fn enforce_origin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let allowed = origin.filter(|value| {
        value
            .to_str()
            .map(|origin| state.config.cors.is_allowed(origin))
            .unwrap_or(false)
    });

    if request.method() == Method::OPTIONS {
        return match allowed {
            Some(origin) => {
                let mut response = StatusCode::NO_CONTENT.into_response();
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(ALLOWED_METHODS),
                );
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOWED_HEADERS),
                );
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
                response
            }
            None => {
                tracing::warn!(path = %request.uri().path(), "preflight from origin not on the allow-list");
                ApiError::forbidden("Origin not allowed").into_response()
            }
        };
    }

    let mut response = next.run(request).await;
    if let Some(origin) = allowed {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
    response
}
