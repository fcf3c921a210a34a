use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::IdentityError;

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait FederatedVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
}

impl TokenInfo {
    // tokeninfo reports booleans as strings
    fn email_verified(&self) -> bool {
        match &self.email_verified {
            Some(serde_json::Value::Bool(v)) => *v,
            Some(serde_json::Value::String(v)) => v == "true",
            _ => false,
        }
    }
}

/// Validates Google ID tokens against the tokeninfo endpoint.
#[derive(Clone)]
pub struct GoogleTokenInfoVerifier {
    http: reqwest::Client,
    endpoint: Url,
    client_id: String,
}

impl GoogleTokenInfoVerifier {
    pub fn new(http: reqwest::Client, client_id: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self::with_endpoint(
            http,
            Url::parse(GOOGLE_TOKENINFO_URL)?,
            client_id,
        ))
    }

    pub fn with_endpoint(http: reqwest::Client, endpoint: Url, client_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl FederatedVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, IdentityError> {
        if self.client_id.is_empty() {
            return Err(IdentityError::FederatedUnavailable(
                "google sign-in is not configured".into(),
            ));
        }

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| IdentityError::FederatedUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(IdentityError::FederatedRejected(format!(
                "tokeninfo returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(IdentityError::FederatedUnavailable(format!(
                "tokeninfo returned {status}"
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::FederatedUnavailable(e.to_string()))?;

        if info.aud != self.client_id {
            return Err(IdentityError::FederatedRejected(
                "token was issued for another client".into(),
            ));
        }
        let verified = info.email_verified();
        let email = info
            .email
            .filter(|email| !email.is_empty() && verified)
            .ok_or_else(|| IdentityError::FederatedRejected("email is not verified".into()))?;

        Ok(FederatedIdentity {
            subject: info.sub,
            email,
            display_name: info.name,
        })
    }
}

#[cfg(test)]
#[path = "tests/federated_tests.rs"]
mod tests;
