use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use fsmapper::types::BAD_REQUEST;
use fsmapper::{Request, Response};
use std::sync::Arc;

use crate::server::ServerState;

/// `POST /fs`: one protocol request per HTTP request.
///
/// Protocol failures stay in the response body; the HTTP status is 200.
/// A body that is not a request answers like a malformed `/ws` frame.
pub(crate) async fn query(
    State(state): State<Arc<ServerState>>,
    request: Result<Json<Request>, JsonRejection>,
) -> Json<Response> {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            return Json(Response::error(
                BAD_REQUEST,
                format!("malformed request: {}", rejection.body_text()),
            ))
        }
    };
    tracing::debug!(cmd = ?request.cmd, path = %request.path, "fs request");
    Json(state.mapper.process(request).await)
}
