//! Deterministic `SoulLlm` test double.
//!
//! Only built with the `test-util` feature — every crate that builds
//! against [`crate::SoulLlm`] pulls this in as a dev-dependency instead of
//! standing up a network-backed provider for unit tests.

use crate::provider::{BestOfNOutcome, CompareOutcome, LlmResult, SoulLlm};
use std::sync::Mutex;

/// Scripted responses, consumed in call order per method. Silently returns
/// an innocuous default if a test exhausts its script — callers that want
/// strict exhaustion checking should assert on the script length themselves.
#[derive(Default)]
pub struct MockSoulLlm {
    generate_script: Mutex<Vec<LlmResult<String>>>,
    compare_script: Mutex<Vec<LlmResult<CompareOutcome>>>,
    best_of_n_script: Mutex<Vec<LlmResult<BestOfNOutcome>>>,
}

impl MockSoulLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_generate(&self, result: LlmResult<String>) -> &Self {
        self.generate_script.lock().unwrap().push(result);
        self
    }

    pub fn push_compare(&self, result: LlmResult<CompareOutcome>) -> &Self {
        self.compare_script.lock().unwrap().push(result);
        self
    }

    pub fn push_best_of_n(&self, result: LlmResult<BestOfNOutcome>) -> &Self {
        self.best_of_n_script.lock().unwrap().push(result);
        self
    }
}

#[async_trait::async_trait]
impl SoulLlm for MockSoulLlm {
    async fn generate(&self, _system: &str, _prompt: &str) -> LlmResult<String> {
        let mut script = self.generate_script.lock().unwrap();
        if script.is_empty() {
            return Ok(String::new());
        }
        script.remove(0)
    }

    async fn compare(&self, _a: &str, _b: &str) -> LlmResult<CompareOutcome> {
        let mut script = self.compare_script.lock().unwrap();
        if script.is_empty() {
            return Ok(CompareOutcome {
                equivalent: false,
                confidence: 0.0,
            });
        }
        script.remove(0)
    }

    async fn compare_best_of_n(&self, _target: &str, _candidates: &[&str]) -> LlmResult<BestOfNOutcome> {
        let mut script = self.best_of_n_script.lock().unwrap();
        if script.is_empty() {
            return Ok(BestOfNOutcome::no_match());
        }
        script.remove(0)
    }
}
