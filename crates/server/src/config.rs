use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const DEV_SESSION_SECRET: &str = "dev-session-secret-change-me";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub public_base_url: String,
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub google_client_id: String,
    pub max_upload_bytes: u64,
    pub proxy_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/davetiye.db".into(),
            public_base_url: "http://127.0.0.1:8080".into(),
            session_secret: DEV_SESSION_SECRET.into(),
            session_ttl_seconds: 7 * 24 * 3600,
            google_client_id: String::new(),
            max_upload_bytes: 10 * 1024 * 1024,
            proxy_timeout_seconds: 10,
        }
    }
}

/// Unprefixed variable names kept for older deployments. The `APP__` form
/// wins when both are set.
const LEGACY_ENV: [(&str, &str); 5] = [
    ("SERVER_BIND", "server_bind"),
    ("DATABASE_URL", "database_url"),
    ("SERVER_PUBLIC_URL", "public_base_url"),
    ("SESSION_SECRET", "session_secret"),
    ("GOOGLE_CLIENT_ID", "google_client_id"),
];

pub fn load_settings() -> anyhow::Result<Settings> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(Path::new("server.toml"), &env)
}

/// Code defaults, then the optional TOML file, then legacy variables, then
/// `APP__*` variables.
pub fn load_settings_from(
    file: &Path,
    env: &HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let mut builder = config::Config::builder().add_source(
        config::File::from(file.to_path_buf())
            .format(config::FileFormat::Toml)
            .required(false),
    );

    let legacy_env = LEGACY_ENV
        .iter()
        .filter_map(|(legacy, key)| {
            env.get(*legacy)
                .map(|value| (key.to_uppercase(), value.clone()))
        })
        .collect();
    builder = builder.add_source(config::Environment::default().source(Some(legacy_env)));

    let app_env = env
        .iter()
        .filter(|(name, _)| name.starts_with("APP__"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    builder = builder.add_source(
        config::Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(Some(app_env)),
    );

    let settings: Settings = builder
        .build()
        .context("failed to assemble server settings")?
        .try_deserialize()
        .context("failed to parse server settings")?;

    if settings.session_secret == DEV_SESSION_SECRET {
        warn!("using the development session secret; set SESSION_SECRET in production");
    }
    Ok(settings)
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn is_windows_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'/' | b'\\')
}

fn sqlite_url_for_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if is_windows_drive_path(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }
    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }
    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        return sqlite_url_for_path(path);
    }
    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return sqlite_url_for_path(path);
    }
    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    sqlite_url_for_path(raw_database_url)
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
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
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
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
#[path = "tests/config_tests.rs"]
mod tests;
