use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fsmapper::MapperError;
use serde::Serialize;

/// Failure of a plain HTTP route: static files, crawls and `/etc`.
///
/// Rendered with its status as `{ "ok": false, "error": { "code", "message" } }`.
/// The protocol endpoints never produce this; their failures are protocol
/// messages `{ "error": <number>, "message" }` inside a 200 response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    ok: bool,
    error: Detail<'a>,
}

#[derive(Serialize)]
struct Detail<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope {
            ok: false,
            error: Detail {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Unresolvable paths and filesystem failures are both misses.
impl From<MapperError> for ApiError {
    fn from(err: MapperError) -> Self {
        let message = err.to_string();
        match err {
            MapperError::NotFound(_) | MapperError::Io(_) => Self::not_found(message),
            MapperError::Config(_) | MapperError::Json(_) => Self::bad_request(message),
            MapperError::Internal(_) => Self::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn mapper_misses_render_as_not_found() {
        let error = ApiError::from(MapperError::NotFound("/nope".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(
            value,
            json!({ "ok": false, "error": { "code": "not_found", "message": "not found: '/nope'" } })
        );
    }
}
