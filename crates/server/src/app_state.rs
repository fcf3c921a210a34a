use server_api::ApiContext;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiContext,
    /// Outbound client for the image proxy.
    pub http: reqwest::Client,
}
