use super::*;
use chrono::Duration;

async fn password_user(storage: &Storage, email: &str) -> UserId {
    storage
        .create_user(NewUser {
            email,
            display_name: Some("Ayşe"),
            password_hash: Some("hash"),
            provider: AuthProvider::Password,
            provider_subject: None,
        })
        .await
        .expect("user")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("invitations.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn sqlite_path_ignores_memory_and_foreign_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://db"), None);
    assert_eq!(
        sqlite_path("sqlite://data/app.db?mode=rwc"),
        Some(PathBuf::from("data/app.db"))
    );
}

#[tokio::test]
async fn finds_users_by_email_and_provider() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let alice = password_user(&storage, "alice@example.com").await;
    let google = storage
        .create_user(NewUser {
            email: "bob@example.com",
            display_name: None,
            password_hash: None,
            provider: AuthProvider::Google,
            provider_subject: Some("google-sub-1"),
        })
        .await
        .expect("google user");

    let by_email = storage
        .find_user_by_email("ALICE@example.com")
        .await
        .expect("lookup")
        .expect("alice exists");
    assert_eq!(by_email.user_id, alice);
    assert_eq!(by_email.summary().display_name.as_deref(), Some("Ayşe"));

    let by_provider = storage
        .find_user_by_provider(AuthProvider::Google, "google-sub-1")
        .await
        .expect("lookup")
        .expect("google user exists");
    assert_eq!(by_provider.user_id, google);
    assert_eq!(by_provider.provider, AuthProvider::Google);

    assert!(storage
        .find_user_by_provider(AuthProvider::Google, "missing")
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    password_user(&storage, "dup@example.com").await;
    let second = storage
        .create_user(NewUser {
            email: "dup@example.com",
            display_name: None,
            password_hash: Some("other"),
            provider: AuthProvider::Password,
            provider_subject: None,
        })
        .await;
    assert!(second.is_err());
}

#[tokio::test]
async fn sessions_expire_and_revoke() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let user = password_user(&storage, "s@example.com").await;

    storage
        .record_session("live", user, Utc::now() + Duration::hours(1))
        .await
        .expect("live session");
    storage
        .record_session("stale", user, Utc::now() - Duration::hours(1))
        .await
        .expect("stale session");

    assert!(storage.session_is_active("live", user).await.expect("live"));
    assert!(!storage.session_is_active("stale", user).await.expect("stale"));
    assert!(!storage
        .session_is_active("live", UserId(user.0 + 1))
        .await
        .expect("other user"));

    assert!(storage.revoke_session("live").await.expect("revoke"));
    assert!(!storage.revoke_session("live").await.expect("revoke twice"));
    assert!(!storage.session_is_active("live", user).await.expect("revoked"));
}

#[tokio::test]
async fn invitation_slug_conflicts_return_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let user = password_user(&storage, "owner@example.com").await;
    let form = InvitationFormData {
        primary_name: "Ayşe".into(),
        secondary_name: "Mehmet".into(),
        ..InvitationFormData::default()
    };
    let seo = SeoOverrides {
        title: Some("Bizim Düğün".into()),
        ..SeoOverrides::default()
    };

    let first = storage
        .insert_invitation(user, "ayse-mehmet", &form, &seo)
        .await
        .expect("insert");
    assert!(first.is_some());
    assert!(storage.slug_exists("ayse-mehmet").await.expect("exists"));

    let second = storage
        .insert_invitation(user, "ayse-mehmet", &form, &seo)
        .await
        .expect("insert conflict");
    assert_eq!(second, None);

    let stored = storage
        .invitation_by_slug("ayse-mehmet")
        .await
        .expect("lookup")
        .expect("stored");
    assert_eq!(Some(stored.id), first);
    assert_eq!(stored.owner_id, user);
    assert_eq!(stored.form, form);
    assert_eq!(stored.seo.title.as_deref(), Some("Bizim Düğün"));
    assert_eq!(stored.seo.description, None);
}

#[tokio::test]
async fn lists_invitations_newest_first_per_owner() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let owner = password_user(&storage, "a@example.com").await;
    let other = password_user(&storage, "b@example.com").await;
    let form = InvitationFormData::default();
    let seo = SeoOverrides::default();

    storage
        .insert_invitation(owner, "first", &form, &seo)
        .await
        .expect("first");
    storage
        .insert_invitation(owner, "second", &form, &seo)
        .await
        .expect("second");
    storage
        .insert_invitation(other, "elsewhere", &form, &seo)
        .await
        .expect("other");

    let slugs = storage
        .list_invitations_for_owner(owner)
        .await
        .expect("list")
        .into_iter()
        .map(|invitation| invitation.slug)
        .collect::<Vec<_>>();
    assert_eq!(slugs, vec!["second".to_string(), "first".to_string()]);
}

#[tokio::test]
async fn resumable_upload_enforces_offsets_and_completes() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let owner = password_user(&storage, "u@example.com").await;

    let upload = storage
        .start_upload(owner, MediaKind::Cover, "cover.jpg", Some("image/jpeg"), 6)
        .await
        .expect("start");

    let appended = storage
        .append_upload_chunk(upload, 0, b"abc")
        .await
        .expect("first chunk");
    assert_eq!(appended, ChunkAppend::Appended { offset: 3 });

    let mismatch = storage
        .append_upload_chunk(upload, 0, b"abc")
        .await
        .expect("replayed chunk");
    assert_eq!(mismatch, ChunkAppend::OffsetMismatch { expected: 3 });

    let overflow = storage
        .append_upload_chunk(upload, 3, b"defg")
        .await
        .expect("oversized chunk");
    assert_eq!(overflow, ChunkAppend::Overflow { total_bytes: 6 });

    let status = storage
        .upload_status(upload)
        .await
        .expect("status")
        .expect("upload exists");
    assert_eq!(status.offset, 3);
    assert_eq!(status.owner_id, owner);
    assert_eq!(status.kind, MediaKind::Cover);

    assert!(storage.complete_upload(upload).await.is_err());

    storage
        .append_upload_chunk(upload, 3, b"def")
        .await
        .expect("last chunk");
    let media_id = storage
        .complete_upload(upload)
        .await
        .expect("complete")
        .expect("media id");

    let media = storage
        .load_media(media_id)
        .await
        .expect("load")
        .expect("media exists");
    assert_eq!(media.bytes, b"abcdef");
    assert_eq!(media.size_bytes, 6);
    assert_eq!(media.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(media.filename, "cover.jpg");

    assert!(storage.upload_status(upload).await.expect("status").is_none());
    assert_eq!(storage.complete_upload(upload).await.expect("gone"), None);
}

#[tokio::test]
async fn appending_to_unknown_upload_fails() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage
        .append_upload_chunk(UploadId(404), 0, b"x")
        .await
        .is_err());
}

async fn session_rows(storage: &Storage) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(storage.pool())
        .await
        .expect("count sessions")
}

#[tokio::test]
async fn ended_sessions_are_purged_on_next_sign_in() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let user = password_user(&storage, "purge@example.com").await;

    storage
        .record_session("expired", user, Utc::now() - Duration::minutes(5))
        .await
        .expect("expired session");
    storage
        .record_session("signed-out", user, Utc::now() + Duration::hours(1))
        .await
        .expect("revoked session");
    assert!(storage.revoke_session("signed-out").await.expect("revoke"));
    assert_eq!(session_rows(&storage).await, 2);

    storage
        .record_session("current", user, Utc::now() + Duration::hours(1))
        .await
        .expect("current session");

    assert_eq!(session_rows(&storage).await, 1);
    assert!(storage.session_is_active("current", user).await.expect("current"));
    assert!(!storage
        .session_is_active("signed-out", user)
        .await
        .expect("purged revoked session"));
}

#[tokio::test]
async fn abandoned_uploads_are_purged_when_a_new_one_starts() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let owner = password_user(&storage, "abandon@example.com").await;

    let abandoned = storage
        .start_upload(owner, MediaKind::Gallery, "old.jpg", None, 10)
        .await
        .expect("start abandoned");
    storage
        .append_upload_chunk(abandoned, 0, b"abcd")
        .await
        .expect("partial chunk");
    let recent = storage
        .start_upload(owner, MediaKind::Gallery, "recent.jpg", None, 10)
        .await
        .expect("start recent");

    sqlx::query("UPDATE upload_sessions SET created_at = datetime('now', '-2 days') WHERE id = ?")
        .bind(abandoned.0)
        .execute(storage.pool())
        .await
        .expect("age upload");

    storage
        .start_upload(owner, MediaKind::Cover, "new.jpg", None, 4)
        .await
        .expect("start new");

    assert!(storage.upload_status(abandoned).await.expect("status").is_none());
    assert!(storage.upload_status(recent).await.expect("status").is_some());
    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_chunks WHERE upload_id = ?")
        .bind(abandoned.0)
        .fetch_one(storage.pool())
        .await
        .expect("count chunks");
    assert_eq!(chunks, 0);
}
