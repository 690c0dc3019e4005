//! The `SoulLlm` capability contract (spec §6) and the lower-level raw
//! streaming provider it is built on.
//!
//! Every crate in this workspace is written against [`SoulLlm`], never
//! against a concrete provider — the same seam the teacher draws between
//! `agenticlaw-llm::provider::LlmProvider` and its callers.

use crate::types::{LlmRequest, StreamDelta};
use futures::Stream;
use std::pin::Pin;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("timed out after {0}ms")]
    TimedOut(u64),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The capability is required but no provider was configured. Spec §7
    /// kind 6 (Fatal): the run must abort, never silently degrade.
    #[error("no LLM capability configured")]
    CapabilityMissing,
}

impl LlmError {
    /// Spec §7 kind 1: network timeout, rate limit, and stream errors are
    /// transient and eligible for backoff-and-retry; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RequestFailed(_)
                | LlmError::RateLimited { .. }
                | LlmError::StreamError(_)
                | LlmError::TimedOut(_)
                | LlmError::NetworkError(_)
        )
    }
}

pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// Raw streaming completion provider. Adapted by a [`SoulLlm`] implementation
/// into the buffered classify/compare/generate contract the rest of the
/// workspace consumes.
#[async_trait::async_trait]
pub trait RawLlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream>;
}

/// A reserved prefix that marks an error smuggled into an otherwise-successful
/// response body. Spec §6 / §9: "error text smuggled into success responses
/// is a known upstream hazard" — any `generate` result that begins with this
/// sentinel after whitespace-trimming is rejected as `InvalidResponse`
/// rather than handed to a caller as text.
pub const ERROR_SENTINEL: &str = "__SOUL_LLM_ERROR__";

/// Outcome of [`SoulLlm::compare`].
#[derive(Clone, Copy, Debug)]
pub struct CompareOutcome {
    pub equivalent: bool,
    pub confidence: f64,
}

/// Outcome of [`SoulLlm::compare_best_of_n`]. `index` is `None` for "no
/// match" (wire value -1); `malformed` distinguishes that from an
/// unparseable response, per spec §6's explicit requirement that the two
/// be distinguishable so the caller can fall back to pairwise comparison.
#[derive(Clone, Debug)]
pub struct BestOfNOutcome {
    pub index: Option<usize>,
    pub confidence: f64,
    pub malformed: bool,
}

impl BestOfNOutcome {
    pub fn no_match() -> Self {
        Self {
            index: None,
            confidence: 0.0,
            malformed: false,
        }
    }

    pub fn malformed() -> Self {
        Self {
            index: None,
            confidence: 0.0,
            malformed: true,
        }
    }
}

/// The injected LLM capability (spec §6). A single buffered completion
/// underlies every operation; implementations adapt a streaming provider
/// by concatenating `StreamDelta::Text` chunks until `Done`.
///
/// Enumerated-category classification (spec §6's `classify` operation) is
/// deliberately absent here: it is implemented once, generically, by the
/// self-healing classifier (`soul-classify`) on top of [`generate`], rather
/// than pushed down into every provider. `compare`/`compare_best_of_n` stay
/// provider-native because their output shape (bool/index + confidence) is
/// simple enough to ask the model for directly.
#[async_trait::async_trait]
pub trait SoulLlm: Send + Sync {
    /// Free-text completion. Must never return text beginning with
    /// [`ERROR_SENTINEL`] as a success value.
    async fn generate(&self, system: &str, prompt: &str) -> LlmResult<String>;

    /// Whether two texts are judged semantically equivalent.
    async fn compare(&self, a: &str, b: &str) -> LlmResult<CompareOutcome>;

    /// Best-matching candidate among up to a handful of texts, judged
    /// against a target. `candidates` is expected to be pre-paged by the
    /// caller (principle-store best-match search pages at a small cap).
    async fn compare_best_of_n(&self, target: &str, candidates: &[&str]) -> LlmResult<BestOfNOutcome>;
}
