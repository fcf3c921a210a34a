use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{EventCategory, Invitation, MediaKind, UploadId, UserSummary},
    error::{ApiError, ErrorCode},
    metadata::PageMetadata,
    protocol::{
        GoogleSignInRequest, MediaUploaded, PublishRequest, PublishedInvitation, SessionResponse,
        SignInRequest, SignUpRequest, StartUploadRequest, TemplateSummary, UploadStatus,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ClientError;

pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;
const MAX_STALLED_ATTEMPTS: u32 = 3;

/// Called with `(bytes_sent, total_bytes)` after every accepted chunk.
pub type UploadProgress<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

#[derive(Debug, Clone, Copy)]
pub struct MediaUpload<'a> {
    pub kind: MediaKind,
    pub filename: &'a str,
    pub mime_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

/// What the wizard needs from the persistence side.
#[async_trait]
pub trait InvitationBackend: Send + Sync {
    async fn is_authenticated(&self) -> bool;
    async fn upload_media(
        &self,
        upload: MediaUpload<'_>,
        progress: UploadProgress<'_>,
    ) -> Result<MediaUploaded, ClientError>;
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedInvitation, ClientError>;
}

async fn check(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status_error = response.error_for_status_ref().err();
    match response.json::<ApiError>().await {
        Ok(api_error) => Err(ClientError::Api(api_error)),
        Err(decode_error) => Err(ClientError::Http(status_error.unwrap_or(decode_error))),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json().await?)
}

/// HTTP adapter for the invitation backend: accounts, resumable media
/// uploads and invitation documents.
pub struct BackendClient {
    http: Client,
    server_url: String,
    chunk_size: usize,
    session: RwLock<Option<SessionResponse>>,
}

impl BackendClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_url)
    }

    pub fn with_http(http: Client, server_url: impl Into<String>) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            session: RwLock::new(None),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn current_user(&self) -> Option<UserSummary> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    async fn bearer(&self) -> Result<String, ClientError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(ClientError::AuthenticationRequired)
    }

    async fn store_session(&self, session: SessionResponse) -> UserSummary {
        let user = session.user.clone();
        info!(user_id = user.user_id.0, "signed in");
        *self.session.write().await = Some(session);
        user
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserSummary, ClientError> {
        let session: SessionResponse = decode(
            self.http
                .post(format!("{}/auth/sign-up", self.server_url))
                .json(&SignUpRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                    display_name: display_name.map(str::to_string),
                })
                .send()
                .await?,
        )
        .await?;
        Ok(self.store_session(session).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserSummary, ClientError> {
        let session: SessionResponse = decode(
            self.http
                .post(format!("{}/auth/sign-in", self.server_url))
                .json(&SignInRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .send()
                .await?,
        )
        .await?;
        Ok(self.store_session(session).await)
    }

    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<UserSummary, ClientError> {
        let session: SessionResponse = decode(
            self.http
                .post(format!("{}/auth/google", self.server_url))
                .json(&GoogleSignInRequest {
                    id_token: id_token.to_string(),
                })
                .send()
                .await?,
        )
        .await?;
        Ok(self.store_session(session).await)
    }

    /// Revokes the server session. The local session is dropped even when
    /// the server call fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        check(
            self.http
                .post(format!("{}/auth/sign-out", self.server_url))
                .bearer_auth(&session.token)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    pub async fn list_templates(
        &self,
        category: Option<EventCategory>,
    ) -> Result<Vec<TemplateSummary>, ClientError> {
        let mut request = self.http.get(format!("{}/templates", self.server_url));
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }
        decode(request.send().await?).await
    }

    async fn start_upload(&self, token: &str, upload: &MediaUpload<'_>) -> Result<UploadStatus, ClientError> {
        decode(
            self.http
                .post(format!("{}/uploads", self.server_url))
                .bearer_auth(token)
                .json(&StartUploadRequest {
                    filename: upload.filename.to_string(),
                    mime_type: upload.mime_type.map(str::to_string),
                    total_bytes: upload.bytes.len() as u64,
                    kind: upload.kind,
                })
                .send()
                .await?,
        )
        .await
    }

    pub async fn upload_status(&self, upload_id: UploadId) -> Result<UploadStatus, ClientError> {
        let token = self.bearer().await?;
        self.fetch_upload_status(&token, upload_id).await
    }

    async fn fetch_upload_status(
        &self,
        token: &str,
        upload_id: UploadId,
    ) -> Result<UploadStatus, ClientError> {
        decode(
            self.http
                .get(format!("{}/uploads/{}", self.server_url, upload_id.0))
                .bearer_auth(token)
                .send()
                .await?,
        )
        .await
    }

    /// Sends the remaining bytes of an existing upload, starting from the
    /// offset the server reports, then finalizes it.
    pub async fn resume_upload(
        &self,
        upload_id: UploadId,
        bytes: &[u8],
        progress: UploadProgress<'_>,
    ) -> Result<MediaUploaded, ClientError> {
        let token = self.bearer().await?;
        let status = self.fetch_upload_status(&token, upload_id).await?;
        self.send_chunks(&token, status, bytes, progress).await
    }

    async fn send_chunks(
        &self,
        token: &str,
        status: UploadStatus,
        bytes: &[u8],
        progress: UploadProgress<'_>,
    ) -> Result<MediaUploaded, ClientError> {
        let upload_id = status.upload_id;
        let total = bytes.len() as u64;
        if status.total_bytes != total {
            return Err(ClientError::Validation(format!(
                "upload {} expects {} bytes, got {total}",
                upload_id.0, status.total_bytes
            )));
        }

        let mut offset = status.offset;
        let mut stalled = 0;
        while offset < total {
            let start = offset as usize;
            let end = (start + self.chunk_size).min(bytes.len());
            let response = self
                .http
                .put(format!("{}/uploads/{}", self.server_url, upload_id.0))
                .query(&[("offset", offset)])
                .bearer_auth(token)
                .body(bytes[start..end].to_vec())
                .send()
                .await?;

            match decode::<UploadStatus>(response).await {
                Ok(accepted) => {
                    offset = accepted.offset;
                    stalled = 0;
                    debug!(upload_id = upload_id.0, offset, total, "chunk accepted");
                    progress(offset, total);
                }
                Err(ClientError::Api(err)) if err.code == ErrorCode::Conflict => {
                    let current = self.fetch_upload_status(token, upload_id).await?;
                    warn!(
                        upload_id = upload_id.0,
                        sent_offset = offset,
                        server_offset = current.offset,
                        "resuming upload from server offset"
                    );
                    if current.offset == offset {
                        stalled += 1;
                        if stalled >= MAX_STALLED_ATTEMPTS {
                            return Err(ClientError::UploadStalled { offset });
                        }
                    }
                    offset = current.offset;
                }
                Err(other) => return Err(other),
            }
        }

        decode(
            self.http
                .post(format!("{}/uploads/{}/complete", self.server_url, upload_id.0))
                .bearer_auth(token)
                .send()
                .await?,
        )
        .await
    }

    pub async fn fetch_invitation(&self, slug: &str) -> Result<Option<Invitation>, ClientError> {
        let response = self
            .http
            .get(format!("{}/invitations/{slug}", self.server_url))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    pub async fn my_invitations(&self) -> Result<Vec<Invitation>, ClientError> {
        let token = self.bearer().await?;
        decode(
            self.http
                .get(format!("{}/me/invitations", self.server_url))
                .bearer_auth(token)
                .send()
                .await?,
        )
        .await
    }

    pub async fn page_metadata(&self, slug: &str) -> Result<PageMetadata, ClientError> {
        decode(
            self.http
                .get(format!("{}/invitations/{slug}/meta", self.server_url))
                .send()
                .await?,
        )
        .await
    }
}

#[async_trait]
impl InvitationBackend for BackendClient {
    async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn upload_media(
        &self,
        upload: MediaUpload<'_>,
        progress: UploadProgress<'_>,
    ) -> Result<MediaUploaded, ClientError> {
        let token = self.bearer().await?;
        let status = self.start_upload(&token, &upload).await?;
        info!(
            upload_id = status.upload_id.0,
            kind = ?upload.kind,
            total_bytes = status.total_bytes,
            "upload started"
        );
        self.send_chunks(&token, status, upload.bytes, progress).await
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedInvitation, ClientError> {
        let token = self.bearer().await?;
        let published: PublishedInvitation = decode(
            self.http
                .post(format!("{}/invitations", self.server_url))
                .bearer_auth(token)
                .json(request)
                .send()
                .await?,
        )
        .await?;
        info!(slug = %published.slug, "invitation published");
        Ok(published)
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
