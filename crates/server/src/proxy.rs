use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::error::{ApiError, ErrorCode};
use tracing::warn;
use url::Url;

use crate::app_state::AppState;

pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
}

type Rejection = (StatusCode, Json<ApiError>);

fn bad_request(message: &str) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(ErrorCode::Validation, message)),
    )
}

fn bad_gateway(message: String) -> Rejection {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiError::new(ErrorCode::Upstream, message)),
    )
}

/// Only absolute http(s) URLs are proxied.
pub fn parse_target(raw: Option<&str>) -> Result<Url, Rejection> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| bad_request("missing url parameter"))?;
    let url = Url::parse(raw).map_err(|_| bad_request("invalid url"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(bad_request("only http and https urls can be proxied"));
    }
    Ok(url)
}

fn too_large(limit: u64) -> Rejection {
    bad_gateway(format!("image exceeds {limit} bytes"))
}

/// Reads the upstream body, refusing anything past `limit` bytes whether or
/// not the upstream announced a length.
async fn read_capped(mut upstream: reqwest::Response, limit: u64) -> Result<Vec<u8>, Rejection> {
    if upstream.content_length().is_some_and(|len| len > limit) {
        return Err(too_large(limit));
    }
    let mut body = Vec::new();
    while let Some(chunk) = upstream
        .chunk()
        .await
        .map_err(|e| bad_gateway(format!("failed to read image: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(too_large(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Re-serves a remote image so the browser can use it without CORS limits.
pub async fn proxy_image(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ProxyQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let target = parse_target(q.url.as_deref())?;

    let upstream = state.http.get(target.clone()).send().await.map_err(|e| {
        warn!(url = %target, error = %e, "image proxy fetch failed");
        bad_gateway(format!("failed to fetch image: {e}"))
    })?;
    let status = upstream.status();
    if !status.is_success() {
        warn!(url = %target, %status, "image proxy upstream error");
        return Err(bad_gateway(format!("upstream responded with {status}")));
    }

    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
    let limit = state.api.max_upload_bytes;
    let body = read_capped(upstream, limit).await.map_err(|rejection| {
        warn!(url = %target, limit, "image proxy body rejected");
        rejection
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));

    Ok((StatusCode::OK, headers, body))
}

#[cfg(test)]
#[path = "tests/proxy_tests.rs"]
mod tests;
