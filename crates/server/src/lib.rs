pub mod app_state;
pub mod config;
mod proxy;
mod routes;

pub use app_state::AppState;
pub use routes::{build_router, status_for};

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;
