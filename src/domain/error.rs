use thiserror::Error;

/// Failures of the source front-end. A failing unit is skipped, not fatal.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("failed to parse {file}: {message}")]
    Malformed { file: String, message: String },
}

impl FrontendError {
    pub fn file(&self) -> &str {
        match self {
            FrontendError::Malformed { file, .. } => file,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown framework version '{0}' (expected v1 or v2)")]
pub struct VersionLabelError(pub String);
