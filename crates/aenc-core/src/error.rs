use thiserror::Error;

use crate::types::Stage;

pub type AencResult<T> = Result<T, AencError>;

#[derive(Debug, Error)]
pub enum AencError {
    #[error("truncated stream in {stage}: record declares {declared} bytes, {available} available")]
    TruncatedStream {
        stage: Stage,
        declared: usize,
        available: usize,
    },

    #[error("malformed {stage}: {reason}")]
    Malformed { stage: Stage, reason: String },

    #[error("unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("key encapsulation error: {0}")]
    Encapsulation(String),

    #[error("key mismatch in {stage}: {reason}")]
    KeyMismatch { stage: Stage, reason: String },

    #[error("invalid padding in {stage}: wrong key, wrong password, or corrupted data")]
    Padding { stage: Stage },

    #[error("ChaCha20 keystream exhausted in {stage}: body exceeds 256 GiB")]
    KeystreamExhausted { stage: Stage },

    #[error("key error: {0}")]
    Key(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AencError {
    pub fn malformed(stage: Stage, reason: impl Into<String>) -> Self {
        AencError::Malformed {
            stage,
            reason: reason.into(),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        AencError::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    /// True when the failure is how a wrong private key or password surfaces.
    ///
    /// The format carries no MAC, so a padding failure is also what random
    /// corruption of the last block looks like.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AencError::KeyMismatch { .. } | AencError::Padding { .. }
        )
    }

    /// Stage the error was raised in, if it is a format error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AencError::TruncatedStream { stage, .. }
            | AencError::Malformed { stage, .. }
            | AencError::KeyMismatch { stage, .. }
            | AencError::Padding { stage }
            | AencError::KeystreamExhausted { stage } => Some(*stage),
            AencError::UnsupportedFormat { .. } => Some(Stage::Header),
            _ => None,
        }
    }
}
