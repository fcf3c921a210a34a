use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        EventCategory, InvitationFormData, InvitationId, MediaId, MediaKind, SeoOverrides,
        UploadId, UserSummary,
    },
    templates::Template,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSignInRequest {
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartUploadRequest {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub total_bytes: u64,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatus {
    pub upload_id: UploadId,
    pub offset: u64,
    pub total_bytes: u64,
}

impl UploadStatus {
    pub fn is_complete(&self) -> bool {
        self.offset >= self.total_bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUploaded {
    pub media_id: MediaId,
    pub kind: MediaKind,
    pub url: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub form: InvitationFormData,
    #[serde(default)]
    pub seo: SeoOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedInvitation {
    pub invitation_id: InvitationId,
    pub slug: String,
    pub share_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub category: EventCategory,
    pub category_label: String,
    pub name: String,
    pub preview_image: String,
    pub supports_avatar: bool,
}

impl From<&Template> for TemplateSummary {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id.to_string(),
            category: template.category,
            category_label: template.category.label().to_string(),
            name: template.name.to_string(),
            preview_image: template.preview_image.to_string(),
            supports_avatar: template.supports_avatar,
        }
    }
}
