pub mod domain;
pub mod error;
pub mod format;
pub mod metadata;
pub mod preview;
pub mod protocol;
pub mod templates;
pub mod wizard;
