use super::*;
use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode as AxumStatus,
    routing::{get, post, put},
    Json, Router,
};
use identity::{FederatedIdentity, FederatedVerifier, IdentityConfig, IdentityError};
use serde::Deserialize;
use server::{build_router, AppState};
use server_api::ApiContext;
use shared::domain::{InvitationFormData, MediaId, SeoOverrides};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use storage::Storage;
use tokio::net::TcpListener;

struct GoogleStub;

#[async_trait]
impl FederatedVerifier for GoogleStub {
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, IdentityError> {
        if id_token != "google-ok" {
            return Err(IdentityError::FederatedRejected("bad token".into()));
        }
        Ok(FederatedIdentity {
            subject: "sub-1".into(),
            email: "google@example.com".into(),
            display_name: Some("Zeynep".into()),
        })
    }
}

async fn serve(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn spawn_backend() -> String {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let state = AppState {
        api: ApiContext {
            storage,
            identity: IdentityConfig {
                secret: "client-test-secret".into(),
                issuer: "davetiye".into(),
                ttl_seconds: 600,
            },
            federated: Arc::new(GoogleStub),
            public_base_url: "https://davetiye.test".into(),
            max_upload_bytes: 1024,
        },
        http: reqwest::Client::new(),
    };
    serve(build_router(Arc::new(state))).await
}

#[tokio::test]
async fn upload_requires_a_session() {
    let client = BackendClient::new(spawn_backend().await);
    let mut progress = |_: u64, _: u64| {};
    let err = client
        .upload_media(
            MediaUpload {
                kind: MediaKind::Cover,
                filename: "cover.jpg",
                mime_type: None,
                bytes: b"abc",
            },
            &mut progress,
        )
        .await
        .expect_err("anonymous");
    assert!(matches!(err, ClientError::AuthenticationRequired));
    assert!(!client.is_authenticated().await);
}

#[tokio::test]
async fn chunked_upload_reports_progress_after_every_chunk() {
    let client = BackendClient::new(spawn_backend().await).with_chunk_size(4);
    client
        .sign_up("ayse@example.com", "correct horse", Some("Ayşe"))
        .await
        .expect("sign up");

    let mut reports = Vec::new();
    let mut progress = |sent: u64, total: u64| reports.push((sent, total));
    let media = client
        .upload_media(
            MediaUpload {
                kind: MediaKind::Gallery,
                filename: "photo.jpg",
                mime_type: Some("image/jpeg"),
                bytes: b"0123456789",
            },
            &mut progress,
        )
        .await
        .expect("upload");

    assert_eq!(reports, vec![(4, 10), (8, 10), (10, 10)]);
    assert_eq!(
        media.url,
        format!("https://davetiye.test/media/{}", media.media_id.0)
    );
    assert_eq!(media.kind, MediaKind::Gallery);
}

#[tokio::test]
async fn interrupted_upload_resumes_from_server_offset() {
    let server_url = spawn_backend().await;
    let client = BackendClient::new(server_url.clone()).with_chunk_size(3);
    client
        .sign_up("resume@example.com", "correct horse", None)
        .await
        .expect("sign up");
    let token = client.bearer().await.expect("token");

    let http = reqwest::Client::new();
    let started: UploadStatus = http
        .post(format!("{server_url}/uploads"))
        .bearer_auth(&token)
        .json(&StartUploadRequest {
            filename: "avatar.png".into(),
            mime_type: Some("image/png".into()),
            total_bytes: 8,
            kind: MediaKind::Avatar,
        })
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("status");
    http.put(format!("{server_url}/uploads/{}", started.upload_id.0))
        .query(&[("offset", 0u64)])
        .bearer_auth(&token)
        .body(b"abcde".to_vec())
        .send()
        .await
        .expect("first chunk")
        .error_for_status()
        .expect("accepted");

    let mut reports = Vec::new();
    let mut progress = |sent: u64, total: u64| reports.push((sent, total));
    let media = client
        .resume_upload(started.upload_id, b"abcdefgh", &mut progress)
        .await
        .expect("resume");

    assert_eq!(reports, vec![(8, 8)]);
    assert_eq!(media.kind, MediaKind::Avatar);
    assert_eq!(media.size_bytes, 8);
}

#[derive(Clone)]
struct FlakyState {
    puts: Arc<AtomicU32>,
}

#[derive(Deserialize)]
struct OffsetQuery {
    offset: u64,
}

async fn flaky_start() -> Json<UploadStatus> {
    Json(UploadStatus {
        upload_id: UploadId(7),
        offset: 0,
        total_bytes: 6,
    })
}

// first chunk is lost in transit: the server already holds 3 bytes
async fn flaky_put(
    State(state): State<FlakyState>,
    Query(q): Query<OffsetQuery>,
    body: axum::body::Bytes,
) -> Result<Json<UploadStatus>, (AxumStatus, Json<ApiError>)> {
    let call = state.puts.fetch_add(1, Ordering::SeqCst);
    if call == 0 {
        return Err((
            AxumStatus::CONFLICT,
            Json(ApiError::new(ErrorCode::Conflict, "expected offset 3")),
        ));
    }
    Ok(Json(UploadStatus {
        upload_id: UploadId(7),
        offset: q.offset + body.len() as u64,
        total_bytes: 6,
    }))
}

async fn flaky_status(Path(_id): Path<i64>) -> Json<UploadStatus> {
    Json(UploadStatus {
        upload_id: UploadId(7),
        offset: 3,
        total_bytes: 6,
    })
}

async fn flaky_complete() -> Json<MediaUploaded> {
    Json(MediaUploaded {
        media_id: MediaId(1),
        kind: MediaKind::Cover,
        url: "https://davetiye.test/media/1".into(),
        size_bytes: 6,
        mime_type: None,
    })
}

#[tokio::test]
async fn offset_conflict_resyncs_with_the_server() {
    let puts = Arc::new(AtomicU32::new(0));
    let app = Router::new()
        .route("/uploads", post(flaky_start))
        .route("/uploads/:id", put(flaky_put).get(flaky_status))
        .route("/uploads/:id/complete", post(flaky_complete))
        .with_state(FlakyState { puts: puts.clone() });
    let client = BackendClient::new(serve(app).await).with_chunk_size(3);
    *client.session.write().await = Some(SessionResponse {
        token: "t".into(),
        expires_at: chrono::Utc::now(),
        user: UserSummary {
            user_id: shared::domain::UserId(1),
            email: "x@example.com".into(),
            display_name: None,
            provider: shared::domain::AuthProvider::Password,
        },
    });

    let mut reports = Vec::new();
    let mut progress = |sent: u64, total: u64| reports.push((sent, total));
    let media = client
        .upload_media(
            MediaUpload {
                kind: MediaKind::Cover,
                filename: "c.png",
                mime_type: None,
                bytes: b"abcdef",
            },
            &mut progress,
        )
        .await
        .expect("upload");

    assert_eq!(media.media_id, MediaId(1));
    assert_eq!(reports, vec![(6, 6)]);
    assert_eq!(puts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn publish_fetch_and_sign_out_round_trip() {
    let client = BackendClient::new(spawn_backend().await);
    client
        .sign_up("pub@example.com", "correct horse", None)
        .await
        .expect("sign up");

    let form = InvitationFormData {
        template_id: "wedding-floral".into(),
        category: EventCategory::Wedding,
        primary_name: "Ayşe".into(),
        secondary_name: "Mehmet".into(),
        ..InvitationFormData::default()
    };
    let published = client
        .publish(&PublishRequest {
            form: form.clone(),
            seo: SeoOverrides::default(),
        })
        .await
        .expect("publish");
    assert_eq!(published.slug, "ayse-mehmet");

    let invitation = client
        .fetch_invitation("ayse-mehmet")
        .await
        .expect("fetch")
        .expect("exists");
    assert_eq!(invitation.form, form);
    assert!(client
        .fetch_invitation("missing")
        .await
        .expect("fetch")
        .is_none());

    let meta = client.page_metadata("ayse-mehmet").await.expect("meta");
    assert_eq!(meta.title, "Ayşe & Mehmet · Düğün Davetiyesi");
    assert_eq!(client.my_invitations().await.expect("mine").len(), 1);

    client.sign_out().await.expect("sign out");
    assert!(!client.is_authenticated().await);
    let err = client.my_invitations().await.expect_err("signed out");
    assert!(matches!(err, ClientError::AuthenticationRequired));
}

#[tokio::test]
async fn server_errors_carry_the_api_error() {
    let client = BackendClient::new(spawn_backend().await);
    let err = client
        .sign_in("nobody@example.com", "correct horse")
        .await
        .expect_err("unknown user");
    let api = err.api_error().expect("api error");
    assert_eq!(api.code, ErrorCode::Unauthorized);

    let user = client
        .sign_in_with_google("google-ok")
        .await
        .expect("google");
    assert_eq!(user.display_name.as_deref(), Some("Zeynep"));
    assert_eq!(
        client.current_user().await.map(|u| u.email),
        Some("google@example.com".to_string())
    );
}

#[tokio::test]
async fn templates_are_listed_by_category() {
    let client = BackendClient::new(spawn_backend().await);
    let henna = client
        .list_templates(Some(EventCategory::Henna))
        .await
        .expect("templates");
    assert!(!henna.is_empty());
    assert!(henna.iter().all(|t| t.category == EventCategory::Henna));
}

#[tokio::test]
async fn invitation_for_mine_is_fetchable_by_anyone() {
    let server_url = spawn_backend().await;
    let owner = BackendClient::new(server_url.clone());
    owner
        .sign_up("mine@example.com", "correct horse", Some("Mine"))
        .await
        .expect("sign up");
    let published = owner
        .publish(&PublishRequest {
            form: InvitationFormData {
                template_id: "birthday-confetti".into(),
                category: EventCategory::Birthday,
                primary_name: "Mine".into(),
                ..InvitationFormData::default()
            },
            seo: SeoOverrides::default(),
        })
        .await
        .expect("publish");
    assert_eq!(published.slug, "mine");

    let guest = BackendClient::new(server_url);
    let invitation = guest
        .fetch_invitation("mine")
        .await
        .expect("fetch")
        .expect("published");
    assert_eq!(invitation.form.primary_name, "Mine");
    assert_eq!(owner.my_invitations().await.expect("mine").len(), 1);
}
