//! Title, description and social image for a public invitation page.
//!
//! Each value resolves as: explicit SEO override, then a value computed from
//! the invitation, then the generic default.

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Invitation, InvitationFormData},
    format::format_event_date_long,
    preview::slides,
};

pub const DEFAULT_TITLE: &str = "Dijital Davetiye";
pub const DEFAULT_DESCRIPTION: &str =
    "Size özel hazırlanmış dijital davetiyeyi görüntülemek için tıklayın.";
pub const DEFAULT_IMAGE_PATH: &str = "/og-default.jpg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

impl PageMetadata {
    pub fn fallback(default_image_url: &str) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            image_url: default_image_url.to_string(),
        }
    }
}

fn override_value(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn computed_title(form: &InvitationFormData) -> Option<String> {
    let names = [form.primary_name.trim(), form.secondary_name.trim()]
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    if !names.is_empty() {
        return Some(format!(
            "{} · {} Davetiyesi",
            names.join(" & "),
            form.category.label()
        ));
    }
    let title = form.title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

pub fn computed_description(form: &InvitationFormData) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(date) = form.event_date {
        parts.push(format_event_date_long(date));
    }
    let venue = form.venue_name.trim();
    if !venue.is_empty() {
        parts.push(venue.to_string());
    }
    if !parts.is_empty() {
        return Some(parts.join(" · "));
    }
    let note = form.note.trim();
    (!note.is_empty()).then(|| note.to_string())
}

pub fn page_metadata(invitation: Option<&Invitation>, default_image_url: &str) -> PageMetadata {
    let Some(invitation) = invitation else {
        return PageMetadata::fallback(default_image_url);
    };
    let form = &invitation.form;
    let seo = &invitation.seo;

    PageMetadata {
        title: override_value(&seo.title)
            .or_else(|| computed_title(form))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: override_value(&seo.description)
            .or_else(|| computed_description(form))
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        image_url: override_value(&seo.image_url)
            .or_else(|| slides(form).into_iter().next())
            .unwrap_or_else(|| default_image_url.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/metadata_tests.rs"]
mod tests;
