pub mod backend;
pub mod error;
pub mod steps;

pub use backend::{BackendClient, InvitationBackend, MediaUpload, UploadProgress};
pub use error::ClientError;
pub use steps::{success_location, Checkout, WizardSession};
