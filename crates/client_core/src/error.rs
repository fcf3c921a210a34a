use shared::{error::ApiError, wizard::WizardStep};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected request ({:?}): {}", .0.code, .0.message)]
    Api(ApiError),
    #[error("sign in to publish the invitation")]
    AuthenticationRequired,
    #[error("{0}")]
    Validation(String),
    #[error("expected the {expected:?} step but the wizard is on {actual:?}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },
    #[error("upload made no progress at offset {offset}")]
    UploadStalled { offset: u64 },
}

impl ClientError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}
