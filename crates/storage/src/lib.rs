use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    AuthProvider, Invitation, InvitationFormData, InvitationId, MediaId, MediaKind, SeoOverrides,
    UploadId, UserId, UserSummary,
};

/// Upload sessions not completed within this window are discarded.
pub const UPLOAD_SESSION_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub provider_subject: Option<String>,
}

impl StoredUser {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.user_id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            provider: self.provider,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub display_name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub provider: AuthProvider,
    pub provider_subject: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub upload_id: UploadId,
    pub owner_id: UserId,
    pub kind: MediaKind,
    pub filename: String,
    pub mime_type: Option<String>,
    pub total_bytes: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAppend {
    Appended { offset: u64 },
    OffsetMismatch { expected: u64 },
    Overflow { total_bytes: u64 },
}

#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub media_id: MediaId,
    pub owner_id: UserId,
    pub kind: MediaKind,
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
}

fn provider_str(provider: AuthProvider) -> &'static str {
    match provider {
        AuthProvider::Password => "password",
        AuthProvider::Google => "google",
    }
}

fn parse_provider(raw: &str) -> AuthProvider {
    match raw {
        "google" => AuthProvider::Google,
        _ => AuthProvider::Password,
    }
}

fn media_kind_str(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Cover => "cover",
        MediaKind::Gallery => "gallery",
        MediaKind::Avatar => "avatar",
    }
}

fn parse_media_kind(raw: &str) -> MediaKind {
    match raw {
        "cover" => MediaKind::Cover,
        "avatar" => MediaKind::Avatar,
        _ => MediaKind::Gallery,
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn user_from_row(r: &SqliteRow) -> StoredUser {
    StoredUser {
        user_id: UserId(r.get::<i64, _>(0)),
        email: r.get::<String, _>(1),
        display_name: r.get::<Option<String>, _>(2),
        password_hash: r.get::<Option<String>, _>(3),
        provider: parse_provider(&r.get::<String, _>(4)),
        provider_subject: r.get::<Option<String>, _>(5),
    }
}

fn invitation_from_row(r: &SqliteRow) -> Result<Invitation> {
    let slug = r.get::<String, _>(1);
    let form: InvitationFormData = serde_json::from_str(&r.get::<String, _>(3))
        .with_context(|| format!("invitation '{slug}' has unreadable form data"))?;
    Ok(Invitation {
        id: InvitationId(r.get::<i64, _>(0)),
        slug,
        owner_id: UserId(r.get::<i64, _>(2)),
        form,
        seo: SeoOverrides {
            title: r.get::<Option<String>, _>(4),
            description: r.get::<Option<String>, _>(5),
            image_url: r.get::<Option<String>, _>(6),
        },
        created_at: r.get::<DateTime<Utc>, _>(7),
        updated_at: r.get::<DateTime<Utc>, _>(8),
    })
}

const INVITATION_COLUMNS: &str = "id, slug, owner_user_id, form_json, seo_title, seo_description, seo_image_url, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, email, display_name, password_hash, provider, provider_subject";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_user(&self, user: NewUser<'_>) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (email, display_name, password_hash, provider, provider_subject)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(user.email)
        .bind(user.display_name)
        .bind(user.password_hash)
        .bind(provider_str(user.provider))
        .bind(user.provider_subject)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to create user '{}'", user.email))?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE provider = ? AND provider_subject = ?"
        ))
        .bind(provider_str(provider))
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn record_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.purge_ended_sessions().await?;
        sqlx::query("INSERT INTO sessions (session_id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(user_id.0)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drops expired and revoked session rows. A missing row already reads as
    /// inactive, so revoked tokens stay rejected.
    pub async fn purge_ended_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE revoked_at IS NOT NULL OR expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Returns `false` when the session was unknown or already revoked.
    pub async fn revoke_session(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ? WHERE session_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn session_is_active(&self, session_id: &str, user_id: UserId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT expires_at FROM sessions
             WHERE session_id = ? AND user_id = ? AND revoked_at IS NULL",
        )
        .bind(session_id)
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some_and(|r| r.get::<DateTime<Utc>, _>(0) > Utc::now()))
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invitations WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Inserts the invitation under `slug`. `None` means the slug is taken.
    pub async fn insert_invitation(
        &self,
        owner_id: UserId,
        slug: &str,
        form: &InvitationFormData,
        seo: &SeoOverrides,
    ) -> Result<Option<InvitationId>> {
        let form_json = serde_json::to_string(form).context("failed to encode form data")?;
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO invitations (slug, owner_user_id, template_id, form_json, seo_title, seo_description, seo_image_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(slug) DO NOTHING
             RETURNING id",
        )
        .bind(slug)
        .bind(owner_id.0)
        .bind(&form.template_id)
        .bind(form_json)
        .bind(seo.title.as_deref())
        .bind(seo.description.as_deref())
        .bind(seo.image_url.as_deref())
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| InvitationId(r.get::<i64, _>(0))))
    }

    pub async fn invitation_by_slug(&self, slug: &str) -> Result<Option<Invitation>> {
        let row = sqlx::query(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(invitation_from_row).transpose()
    }

    pub async fn list_invitations_for_owner(&self, owner_id: UserId) -> Result<Vec<Invitation>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE owner_user_id = ? ORDER BY id DESC"
        ))
        .bind(owner_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(invitation_from_row).collect()
    }

    pub async fn start_upload(
        &self,
        owner_id: UserId,
        kind: MediaKind,
        filename: &str,
        mime_type: Option<&str>,
        total_bytes: u64,
    ) -> Result<UploadId> {
        self.purge_stale_uploads(Duration::hours(UPLOAD_SESSION_TTL_HOURS))
            .await?;
        let rec = sqlx::query(
            "INSERT INTO upload_sessions (owner_user_id, kind, filename, mime_type, total_bytes)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(owner_id.0)
        .bind(media_kind_str(kind))
        .bind(filename)
        .bind(mime_type)
        .bind(to_i64(total_bytes))
        .fetch_one(&self.pool)
        .await?;
        Ok(UploadId(rec.get::<i64, _>(0)))
    }

    /// Removes upload sessions (and their chunks) started more than
    /// `max_age` ago.
    pub async fn purge_stale_uploads(&self, max_age: Duration) -> Result<u64> {
        let cutoff = format!("-{} seconds", max_age.num_seconds());
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM upload_chunks WHERE upload_id IN
                (SELECT id FROM upload_sessions WHERE created_at < datetime('now', ?))",
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM upload_sessions WHERE created_at < datetime('now', ?)")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn upload_status(&self, upload_id: UploadId) -> Result<Option<StoredUpload>> {
        let row = sqlx::query(
            "SELECT s.id, s.owner_user_id, s.kind, s.filename, s.mime_type, s.total_bytes,
                    COALESCE((SELECT SUM(length(c.bytes)) FROM upload_chunks c WHERE c.upload_id = s.id), 0)
             FROM upload_sessions s
             WHERE s.id = ?",
        )
        .bind(upload_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| StoredUpload {
            upload_id: UploadId(r.get::<i64, _>(0)),
            owner_id: UserId(r.get::<i64, _>(1)),
            kind: parse_media_kind(&r.get::<String, _>(2)),
            filename: r.get::<String, _>(3),
            mime_type: r.get::<Option<String>, _>(4),
            total_bytes: r.get::<i64, _>(5) as u64,
            offset: r.get::<i64, _>(6) as u64,
        }))
    }

    /// Appends `bytes` at `offset`; the offset must equal the bytes received so far.
    pub async fn append_upload_chunk(
        &self,
        upload_id: UploadId,
        offset: u64,
        bytes: &[u8],
    ) -> Result<ChunkAppend> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT s.total_bytes,
                    COALESCE((SELECT SUM(length(c.bytes)) FROM upload_chunks c WHERE c.upload_id = s.id), 0)
             FROM upload_sessions s
             WHERE s.id = ?",
        )
        .bind(upload_id.0)
        .fetch_optional(&mut *tx)
        .await?
        .with_context(|| format!("upload {} does not exist", upload_id.0))?;

        let total_bytes = row.get::<i64, _>(0) as u64;
        let received = row.get::<i64, _>(1) as u64;
        if offset != received {
            return Ok(ChunkAppend::OffsetMismatch { expected: received });
        }
        let next_offset = received + bytes.len() as u64;
        if next_offset > total_bytes {
            return Ok(ChunkAppend::Overflow { total_bytes });
        }

        sqlx::query("INSERT INTO upload_chunks (upload_id, chunk_offset, bytes) VALUES (?, ?, ?)")
            .bind(upload_id.0)
            .bind(to_i64(offset))
            .bind(bytes)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(ChunkAppend::Appended {
            offset: next_offset,
        })
    }

    /// Moves a fully received upload into `media` and drops the session.
    pub async fn complete_upload(&self, upload_id: UploadId) -> Result<Option<MediaId>> {
        let mut tx = self.pool.begin().await?;
        let Some(session) = sqlx::query(
            "SELECT owner_user_id, kind, filename, mime_type, total_bytes
             FROM upload_sessions WHERE id = ?",
        )
        .bind(upload_id.0)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let chunks = sqlx::query(
            "SELECT bytes FROM upload_chunks WHERE upload_id = ? ORDER BY chunk_offset ASC",
        )
        .bind(upload_id.0)
        .fetch_all(&mut *tx)
        .await?;
        let mut bytes = Vec::new();
        for chunk in chunks {
            bytes.extend_from_slice(&chunk.get::<Vec<u8>, _>(0));
        }

        let total_bytes = session.get::<i64, _>(4) as u64;
        anyhow::ensure!(
            bytes.len() as u64 == total_bytes,
            "upload {} is incomplete: {} of {} bytes",
            upload_id.0,
            bytes.len(),
            total_bytes
        );

        let rec = sqlx::query(
            "INSERT INTO media (owner_user_id, kind, filename, mime_type, bytes, size_bytes)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(session.get::<i64, _>(0))
        .bind(session.get::<String, _>(1))
        .bind(session.get::<String, _>(2))
        .bind(session.get::<Option<String>, _>(3))
        .bind(&bytes)
        .bind(to_i64(total_bytes))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM upload_chunks WHERE upload_id = ?")
            .bind(upload_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM upload_sessions WHERE id = ?")
            .bind(upload_id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(MediaId(rec.get::<i64, _>(0))))
    }

    pub async fn load_media(&self, media_id: MediaId) -> Result<Option<StoredMedia>> {
        let row = sqlx::query(
            "SELECT id, owner_user_id, kind, filename, mime_type, bytes, size_bytes FROM media WHERE id = ?",
        )
        .bind(media_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| StoredMedia {
            media_id: MediaId(r.get::<i64, _>(0)),
            owner_id: UserId(r.get::<i64, _>(1)),
            kind: parse_media_kind(&r.get::<String, _>(2)),
            filename: r.get::<String, _>(3),
            mime_type: r.get::<Option<String>, _>(4),
            bytes: r.get::<Vec<u8>, _>(5),
            size_bytes: r.get::<i64, _>(6) as u64,
        }))
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
