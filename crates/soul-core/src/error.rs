//! Error types for the synthesis core

use thiserror::Error;

/// The six error kinds from the design: transient, classifier-unresolved,
/// validation, state-corrupt, concurrency, fatal. Lower crates raise their
/// own narrower errors; this is the composed error the pipeline and cycle
/// manager surface to callers.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("transient failure after retries: {0}")]
    Transient(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("state corrupt: {0}")]
    StateCorrupt(String),

    #[error("lock held by pid {holder_pid}")]
    LockHeld { holder_pid: u32 },

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynthesisError>;

impl SynthesisError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }
}
