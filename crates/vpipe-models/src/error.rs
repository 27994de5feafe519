//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown video status: {0}")]
    UnknownStatus(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

impl ModelError {
    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self::InvalidProfile(msg.into())
    }
}
