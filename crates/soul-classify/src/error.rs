use thiserror::Error;

/// Spec §7 kind 1/2 as seen by a classifier caller: the LLM call itself
/// persistently failed (after backoff), surfaced here rather than as a
/// null category — a null category means "the model answered, but we
/// could not resolve it," which is a distinct condition from "the model
/// never answered."
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("classifier failed: {0}")]
    LlmFailed(#[from] soul_llm::LlmError),
}

pub type ClassifyResult<T> = std::result::Result<T, ClassifyError>;
