use std::{net::SocketAddr, sync::Arc, time::Duration};

use identity::{GoogleTokenInfoVerifier, IdentityConfig};
use server::{
    build_router,
    config::{load_settings, prepare_database_url},
    AppState,
};
use server_api::ApiContext;
use storage::Storage;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SESSION_ISSUER: &str = "davetiye";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.proxy_timeout_seconds))
        .build()?;
    let federated = GoogleTokenInfoVerifier::new(http.clone(), settings.google_client_id.clone())?;
    if settings.google_client_id.is_empty() {
        info!("google sign-in disabled: no client id configured");
    }

    let api = ApiContext {
        storage,
        identity: IdentityConfig {
            secret: settings.session_secret,
            issuer: SESSION_ISSUER.into(),
            ttl_seconds: settings.session_ttl_seconds,
        },
        federated: Arc::new(federated),
        public_base_url: settings.public_base_url,
        max_upload_bytes: settings.max_upload_bytes,
    };
    let app = build_router(Arc::new(AppState { api, http }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
