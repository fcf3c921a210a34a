use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use identity::{FederatedIdentity, FederatedVerifier, IdentityConfig, IdentityError};
use server_api::ApiContext;
use storage::Storage;

use crate::{build_router, AppState};

struct RejectAll;

#[async_trait]
impl FederatedVerifier for RejectAll {
    async fn verify(&self, _id_token: &str) -> Result<FederatedIdentity, IdentityError> {
        Err(IdentityError::FederatedRejected("test verifier".into()))
    }
}

pub async fn test_state() -> Arc<AppState> {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    Arc::new(AppState {
        api: ApiContext {
            storage,
            identity: IdentityConfig {
                secret: "route-secret".into(),
                issuer: "davetiye".into(),
                ttl_seconds: 600,
            },
            federated: Arc::new(RejectAll),
            public_base_url: "http://davetiye.test".into(),
            max_upload_bytes: 64,
        },
        http: reqwest::Client::new(),
    })
}

pub async fn test_app() -> Router {
    build_router(test_state().await)
}
