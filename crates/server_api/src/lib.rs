use std::sync::Arc;

use identity::{FederatedVerifier, IdentityConfig};
use shared::{
    domain::{MediaId, UserId},
    error::{ApiError, ErrorCode},
    metadata::DEFAULT_IMAGE_PATH,
};
use storage::Storage;

mod auth;
mod catalog;
mod invitations;
mod uploads;

pub use auth::{authenticate, google_sign_in, sign_in, sign_out, sign_up};
pub use catalog::{list_templates, template_defaults};
pub use invitations::{
    invitation_by_slug, list_my_invitations, page_metadata, publish_invitation,
    MAX_SLUG_ATTEMPTS,
};
pub use uploads::{append_upload_chunk, complete_upload, load_media, start_upload, upload_status};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub identity: IdentityConfig,
    pub federated: Arc<dyn FederatedVerifier>,
    pub public_base_url: String,
    pub max_upload_bytes: u64,
}

impl ApiContext {
    fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    pub fn media_url(&self, media_id: MediaId) -> String {
        format!("{}/media/{}", self.base_url(), media_id.0)
    }

    pub fn share_url(&self, slug: &str) -> String {
        format!("{}/{slug}", self.base_url())
    }

    pub fn default_image_url(&self) -> String {
        format!("{}{DEFAULT_IMAGE_PATH}", self.base_url())
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

fn not_found(what: &str) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("{what} not found"))
}

fn ensure_owner(owner_id: UserId, user_id: UserId, what: &str) -> Result<(), ApiError> {
    // other users' resources are indistinguishable from missing ones
    if owner_id != user_id {
        return Err(not_found(what));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;
