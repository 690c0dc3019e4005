//! Soul LLM — the injected LLM capability contract and its Anthropic
//! adapter.
//!
//! Every other crate in this workspace is written against [`SoulLlm`],
//! never against a concrete provider (the same seam the teacher draws for
//! `agenticlaw-llm::provider::LlmProvider`).

pub mod anthropic;
pub mod provider;
pub mod retry;
pub mod types;

#[cfg(feature = "test-util")]
pub mod mock;

pub use anthropic::{AnthropicProvider, AnthropicSoulLlm};
pub use provider::{
    BestOfNOutcome, CompareOutcome, LlmError, LlmResult, LlmStream, RawLlmProvider, SoulLlm,
    ERROR_SENTINEL,
};

#[cfg(feature = "test-util")]
pub use mock::MockSoulLlm;
