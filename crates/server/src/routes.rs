use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{
    append_upload_chunk, authenticate, complete_upload, google_sign_in, invitation_by_slug,
    list_my_invitations, list_templates, load_media, page_metadata, publish_invitation, sign_in,
    sign_out, sign_up, start_upload, template_defaults, upload_status,
};
use shared::{
    domain::{EventCategory, Invitation, MediaId, UploadId, UserId},
    error::{ApiError, ErrorCode},
    metadata::PageMetadata,
    protocol::{
        GoogleSignInRequest, MediaUploaded, PublishRequest, PublishedInvitation, SessionResponse,
        SignInRequest, SignUpRequest, StartUploadRequest, TemplateSummary, UploadStatus,
    },
    templates::TemplateDefaults,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};

use crate::{app_state::AppState, proxy::proxy_image};

type Rejection = (StatusCode, Json<ApiError>);

const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// HTTP status for a service error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> Rejection {
    if err.code == ErrorCode::Internal {
        error!(message = %err.message, "request failed");
    }
    (status_for(err.code), Json(err))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = usize::try_from(state.api.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .max(JSON_BODY_LIMIT);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/templates", get(http_list_templates))
        .route("/templates/:template_id/defaults", get(http_template_defaults))
        .route("/auth/sign-up", post(http_sign_up))
        .route("/auth/sign-in", post(http_sign_in))
        .route("/auth/google", post(http_google_sign_in))
        .route("/auth/sign-out", post(http_sign_out))
        .route("/uploads", post(http_start_upload))
        .route(
            "/uploads/:upload_id",
            get(http_upload_status).put(http_append_chunk),
        )
        .route("/uploads/:upload_id/complete", post(http_complete_upload))
        .route("/media/:media_id", get(http_download_media))
        .route("/invitations", post(http_publish))
        .route("/me/invitations", get(http_my_invitations))
        .route("/invitations/:slug", get(http_invitation))
        .route("/invitations/:slug/meta", get(http_invitation_meta))
        .route("/api/proxy-image", get(proxy_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    debug!(%method, %path, status = response.status().as_u16(), "request handled");
    response
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, Rejection> {
    state.api.storage.health_check().await.map_err(|e| {
        reject(ApiError::new(
            ErrorCode::Internal,
            format!("storage unavailable: {e}"),
        ))
    })?;
    Ok("ok")
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, Rejection> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            reject(ApiError::new(
                ErrorCode::Unauthorized,
                "missing bearer token",
            ))
        })
}

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<UserId, Rejection> {
    let token = bearer_token(headers)?;
    authenticate(&state.api, token).await.map_err(reject)
}

#[derive(Debug, Deserialize)]
struct TemplatesQuery {
    category: Option<EventCategory>,
}

async fn http_list_templates(Query(q): Query<TemplatesQuery>) -> Json<Vec<TemplateSummary>> {
    Json(list_templates(q.category))
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsQuery {
    #[serde(default)]
    primary_name: String,
    #[serde(default)]
    secondary_name: String,
}

async fn http_template_defaults(
    Path(template_id): Path<String>,
    Query(q): Query<DefaultsQuery>,
) -> Json<TemplateDefaults> {
    Json(template_defaults(
        &template_id,
        &q.primary_name,
        &q.secondary_name,
    ))
}

async fn http_sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), Rejection> {
    let session = sign_up(&state.api, req).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn http_sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, Rejection> {
    let session = sign_in(&state.api, req).await.map_err(reject)?;
    Ok(Json(session))
}

async fn http_google_sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleSignInRequest>,
) -> Result<Json<SessionResponse>, Rejection> {
    let session = google_sign_in(&state.api, req).await.map_err(reject)?;
    Ok(Json(session))
}

async fn http_sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, Rejection> {
    let token = bearer_token(&headers)?;
    sign_out(&state.api, token).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_start_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<StartUploadRequest>,
) -> Result<(StatusCode, Json<UploadStatus>), Rejection> {
    let user_id = require_user(&state, &headers).await?;
    let status = start_upload(&state.api, user_id, req)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(status)))
}

#[derive(Debug, Deserialize)]
struct ChunkQuery {
    offset: u64,
}

async fn http_append_chunk(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<i64>,
    Query(q): Query<ChunkQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadStatus>, Rejection> {
    let user_id = require_user(&state, &headers).await?;
    let status = append_upload_chunk(&state.api, user_id, UploadId(upload_id), q.offset, &body)
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

async fn http_upload_status(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<UploadStatus>, Rejection> {
    let user_id = require_user(&state, &headers).await?;
    let status = upload_status(&state.api, user_id, UploadId(upload_id))
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

async fn http_complete_upload(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MediaUploaded>, Rejection> {
    let user_id = require_user(&state, &headers).await?;
    let media = complete_upload(&state.api, user_id, UploadId(upload_id))
        .await
        .map_err(reject)?;
    Ok(Json(media))
}

async fn http_download_media(
    State(state): State<Arc<AppState>>,
    Path(media_id): Path<i64>,
) -> Result<impl IntoResponse, Rejection> {
    let media = load_media(&state.api, MediaId(media_id))
        .await
        .map_err(reject)?;

    let mut headers = HeaderMap::new();
    let content_type = media
        .mime_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(crate::proxy::CACHE_CONTROL),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("inline; filename=\"{}\"", media.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, media.bytes))
}

async fn http_publish(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PublishRequest>,
) -> Result<(StatusCode, Json<PublishedInvitation>), Rejection> {
    let user_id = require_user(&state, &headers).await?;
    let published = publish_invitation(&state.api, user_id, req)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(published)))
}

async fn http_my_invitations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Invitation>>, Rejection> {
    let user_id = require_user(&state, &headers).await?;
    let invitations = list_my_invitations(&state.api, user_id)
        .await
        .map_err(reject)?;
    Ok(Json(invitations))
}

async fn http_invitation(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Invitation>, Rejection> {
    let invitation = invitation_by_slug(&state.api, &slug)
        .await
        .map_err(reject)?;
    Ok(Json(invitation))
}

async fn http_invitation_meta(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Json<PageMetadata> {
    Json(page_metadata(&state.api, &slug).await)
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
