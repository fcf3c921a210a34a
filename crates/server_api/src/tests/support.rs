use std::sync::Arc;

use async_trait::async_trait;
use identity::{FederatedIdentity, FederatedVerifier, IdentityConfig, IdentityError};
use storage::Storage;

use crate::ApiContext;

/// Accepts `google:<subject>:<email>` tokens; `down` simulates an outage.
pub struct StubVerifier;

#[async_trait]
impl FederatedVerifier for StubVerifier {
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, IdentityError> {
        if id_token == "down" {
            return Err(IdentityError::FederatedUnavailable("offline".into()));
        }
        let mut parts = id_token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("google"), Some(subject), Some(email)) => Ok(FederatedIdentity {
                subject: subject.to_string(),
                email: email.to_string(),
                display_name: Some("Google User".into()),
            }),
            _ => Err(IdentityError::FederatedRejected("bad token".into())),
        }
    }
}

pub async fn context() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext {
        storage,
        identity: IdentityConfig {
            secret: "test-secret".into(),
            issuer: "davetiye".into(),
            ttl_seconds: 3600,
        },
        federated: Arc::new(StubVerifier),
        public_base_url: "https://davetiye.test/".into(),
        max_upload_bytes: 1024,
    }
}
