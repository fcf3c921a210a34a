use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use client_core::{BackendClient, ClientError, WizardSession};
use identity::{FederatedIdentity, FederatedVerifier, IdentityConfig, IdentityError};
use server::{build_router, AppState};
use server_api::ApiContext;
use shared::{
    domain::{FormDataPatch, MediaKind, SeoOverrides},
    wizard::WizardStep,
};
use storage::Storage;
use tokio::net::TcpListener;

struct NoFederation;

#[async_trait]
impl FederatedVerifier for NoFederation {
    async fn verify(&self, _id_token: &str) -> Result<FederatedIdentity, IdentityError> {
        Err(IdentityError::FederatedUnavailable("not configured".into()))
    }
}

async fn spawn_server() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let state = AppState {
        api: ApiContext {
            storage,
            identity: IdentityConfig {
                secret: "wizard-flow-secret".into(),
                issuer: "davetiye".into(),
                ttl_seconds: 600,
            },
            federated: Arc::new(NoFederation),
            public_base_url: "https://davetiye.test".into(),
            max_upload_bytes: 4096,
        },
        http: reqwest::Client::new(),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(Arc::new(state))).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn wizard_publishes_an_invitation_end_to_end() {
    let server_url = spawn_server().await;
    let client = BackendClient::new(server_url.clone()).with_chunk_size(16);
    let mut wizard = WizardSession::new(client);

    wizard.choose_template("wedding-floral").expect("template");
    wizard
        .submit_details(FormDataPatch {
            primary_name: Some("Ayşe".into()),
            secondary_name: Some("Mehmet".into()),
            event_date: Some(NaiveDate::from_ymd_opt(2026, 6, 20)),
            venue_name: Some("Boğaz Korusu".into()),
            ..FormDataPatch::default()
        })
        .expect("details");
    assert_eq!(wizard.form_data().title, "Ayşe & Mehmet");

    let cover = vec![7u8; 40];
    let mut last_progress = (0, 0);
    let mut progress = |sent: u64, total: u64| last_progress = (sent, total);
    let err = wizard
        .attach_media(MediaKind::Cover, "cover.jpg", Some("image/jpeg"), &cover, &mut progress)
        .await
        .expect_err("anonymous upload");
    assert!(matches!(err, ClientError::AuthenticationRequired));

    wizard
        .backend()
        .sign_up("ayse@example.com", "correct horse", Some("Ayşe"))
        .await
        .expect("sign up");
    let uploaded = wizard
        .attach_media(MediaKind::Cover, "cover.jpg", Some("image/jpeg"), &cover, &mut progress)
        .await
        .expect("cover upload");
    assert_eq!(last_progress, (40, 40));
    assert_eq!(
        wizard.form_data().cover_image_url.as_deref(),
        Some(uploaded.url.as_str())
    );

    wizard.set_seo_overrides(SeoOverrides {
        description: Some("  Bizimle olun  ".into()),
        ..SeoOverrides::default()
    });
    wizard.proceed_to_payment().expect("payment step");
    let checkout = wizard.complete_payment().await.expect("checkout");
    assert_eq!(checkout.published.slug, "ayse-mehmet");
    assert_eq!(checkout.success_location, "/success?slug=ayse-mehmet");
    assert_eq!(wizard.state().step, WizardStep::Payment);
    assert_eq!(
        wizard.state().invitation_id,
        Some(checkout.published.invitation_id)
    );

    let reader = BackendClient::new(server_url);
    let invitation = reader
        .fetch_invitation("ayse-mehmet")
        .await
        .expect("fetch")
        .expect("published");
    assert_eq!(invitation.form.venue_name, "Boğaz Korusu");
    assert_eq!(invitation.seo.description.as_deref(), Some("Bizimle olun"));

    let meta = reader.page_metadata("ayse-mehmet").await.expect("meta");
    assert_eq!(meta.description, "Bizimle olun");
    assert_eq!(meta.image_url, uploaded.url);
}
