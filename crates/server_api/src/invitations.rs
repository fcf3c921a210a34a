use shared::{
    domain::{Invitation, UserId},
    error::{ApiError, ErrorCode},
    format::{generate_slug, is_reserved_slug, numbered_slug},
    metadata::{self, PageMetadata},
    protocol::{PublishRequest, PublishedInvitation},
};
use tracing::{info, warn};

use crate::{internal, not_found, ApiContext};

pub const MAX_SLUG_ATTEMPTS: u32 = 100;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Persists the invitation under a slug derived from the participant names,
/// suffixed `-2`, `-3`, ... until it is free. Reserved path segments count
/// as taken.
pub async fn publish_invitation(
    ctx: &ApiContext,
    user_id: UserId,
    req: PublishRequest,
) -> Result<PublishedInvitation, ApiError> {
    let PublishRequest { form, mut seo } = req;
    if form.template_id.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "template is required"));
    }
    seo.title = trimmed(seo.title);
    seo.description = trimmed(seo.description);
    seo.image_url = trimmed(seo.image_url);

    let base = generate_slug(&form.primary_name, &form.secondary_name);
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let slug = numbered_slug(&base, attempt);
        if is_reserved_slug(&slug) {
            continue;
        }
        let inserted = ctx
            .storage
            .insert_invitation(user_id, &slug, &form, &seo)
            .await
            .map_err(internal)?;
        if let Some(invitation_id) = inserted {
            info!(invitation_id = invitation_id.0, %slug, "invitation published");
            return Ok(PublishedInvitation {
                invitation_id,
                share_url: ctx.share_url(&slug),
                slug,
            });
        }
    }

    Err(ApiError::new(
        ErrorCode::Conflict,
        format!("no free slug for '{base}'"),
    ))
}

pub async fn invitation_by_slug(ctx: &ApiContext, slug: &str) -> Result<Invitation, ApiError> {
    ctx.storage
        .invitation_by_slug(slug)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("invitation"))
}

pub async fn list_my_invitations(
    ctx: &ApiContext,
    user_id: UserId,
) -> Result<Vec<Invitation>, ApiError> {
    ctx.storage
        .list_invitations_for_owner(user_id)
        .await
        .map_err(internal)
}

/// Never fails: a missing invitation or a storage error yields the generic
/// defaults.
pub async fn page_metadata(ctx: &ApiContext, slug: &str) -> PageMetadata {
    let invitation = match ctx.storage.invitation_by_slug(slug).await {
        Ok(invitation) => invitation,
        Err(err) => {
            warn!(%slug, error = %err, "metadata lookup failed");
            None
        }
    };
    metadata::page_metadata(invitation.as_ref(), &ctx.default_image_url())
}

#[cfg(test)]
#[path = "tests/invitations_tests.rs"]
mod tests;
