use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fsmapper::config::{ALTERNATE_ENTRY_POINT, DEFAULT_ENTRY_POINT};
use fsmapper::{strip_crawl_marker, FsMapper};
use std::path::PathBuf;
use std::sync::Arc;

use crate::server::error::ApiError;
use crate::server::ServerState;

/// Fallback for every `GET` not claimed by another route.
///
/// Paths ending in `!` or `.ls` answer with the crawled `head` stat as JSON.
/// Everything else is served as raw bytes from the namespace.
pub(crate) async fn serve(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
) -> Result<Response<Body>, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::method_not_allowed(format!("{method} not supported")));
    }
    let path = urlencoding::decode(uri.path())
        .map_err(|_| ApiError::bad_request("path is not valid utf-8"))?;

    if strip_crawl_marker(&path).1 {
        let stat = state.mapper.head(&path).await?;
        return Ok(Json(stat).into_response());
    }

    let file = locate_document(&state.mapper, &path).await?;
    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|_| ApiError::not_found("asset not found"))?;
    tracing::trace!(path = %path, file = %file.display(), "static");
    file_response(&file, bytes)
}

/// `GET /etc/*path`: files from the selected environment configuration.
pub(crate) async fn serve_etc(
    State(state): State<Arc<ServerState>>,
    Path(asset_path): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let etc_dir = state
        .etc_dir
        .as_ref()
        .ok_or_else(|| ApiError::not_found("no environment configuration"))?;

    let asset_path = asset_path.trim_end_matches('/');
    if asset_path.split('/').any(|segment| segment.starts_with('.')) {
        return Err(ApiError::forbidden("dotfiles denied"));
    }

    let base_dir = tokio::fs::canonicalize(etc_dir)
        .await
        .map_err(|_| ApiError::not_found("environment configuration not found"))?;
    let resolved = tokio::fs::canonicalize(base_dir.join(asset_path))
        .await
        .map_err(|_| ApiError::not_found("asset not found"))?;

    // Path traversal guard
    if !resolved.starts_with(&base_dir) {
        return Err(ApiError::forbidden("path traversal denied"));
    }

    let bytes = tokio::fs::read(&resolved)
        .await
        .map_err(|_| ApiError::not_found("asset not found"))?;
    file_response(&resolved, bytes)
}

/// Physical file behind a URL path.
///
/// `/` is the default document. A directory of the document root serves the
/// default document; any other directory serves its entry point.
async fn locate_document(mapper: &FsMapper, path: &str) -> Result<PathBuf, ApiError> {
    let path = if path == "/" {
        format!("/{}", mapper.default_document())
    } else {
        path.to_string()
    };
    let resolution = mapper.namespace().resolve(&path)?;
    let physical = resolution.physical_path();
    let metadata = tokio::fs::metadata(&physical)
        .await
        .map_err(|_| ApiError::not_found(format!("'{path}' not found")))?;
    if !metadata.is_dir() {
        return Ok(physical);
    }

    let candidates = if resolution.is_document_root() {
        vec![mapper.default_document()]
    } else {
        vec![ALTERNATE_ENTRY_POINT, DEFAULT_ENTRY_POINT]
    };
    for candidate in candidates {
        let file = physical.join(candidate);
        if tokio::fs::metadata(&file)
            .await
            .is_ok_and(|metadata| metadata.is_file())
        {
            return Ok(file);
        }
    }
    Err(ApiError::not_found(format!("'{path}' has no index")))
}

fn file_response(file: &std::path::Path, bytes: Vec<u8>) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(file))
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(e.to_string()))
}

fn content_type(file: &std::path::Path) -> &'static str {
    match file.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "html" => "text/html",
        "json" | "map" => "application/json",
        "txt" | "md" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        _ => "application/octet-stream",
    }
}
