//! Signal generalizer (spec §4.3): actor-agnostic paraphrase with caching,
//! one-retry validation, and fallback.

use crate::cache::GeneralizationCache;
use crate::validate::validate_generalization;
use rand::Rng;
use soul_core::{GeneralizedSignal, Signal};
use soul_llm::SoulLlm;
use tokio::sync::Semaphore;
use tracing::debug;

pub const PROMPT_VERSION: &str = "generalize-v1";

const SYSTEM_PROMPT: &str = "\
Rewrite the statement as an actor-agnostic, imperative description of a value or trait, \
with no first- or second-person pronouns (no \"I\", \"you\", \"my\", \"your\", etc.) and no \
policy invention beyond what the statement already says. Keep it under 280 characters. \
Example: \"I always tell the truth even when it's hard\" becomes \"Values honesty over \
comfort\". Respond with only the rewritten sentence.";

pub struct Generalizer<'a> {
    llm: &'a dyn SoulLlm,
    cache: &'a GeneralizationCache,
    model_id: String,
}

impl<'a> Generalizer<'a> {
    pub fn new(llm: &'a dyn SoulLlm, cache: &'a GeneralizationCache, model_id: impl Into<String>) -> Self {
        Self {
            llm,
            cache,
            model_id: model_id.into(),
        }
    }

    /// Generalizes one signal, consulting the cache first (spec §4.3 cache
    /// key: signal-id + content hash + prompt-version + model-id).
    pub async fn generalize_one(&self, signal: &Signal) -> GeneralizedSignal {
        let key = GeneralizationCache::key(&signal.id, &signal.text, PROMPT_VERSION, &self.model_id);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let generalized = self.generate_with_retry(signal).await;
        self.cache.put(key, generalized.clone());
        generalized
    }

    async fn generate_with_retry(&self, signal: &Signal) -> GeneralizedSignal {
        let prompt = format!(
            "Dimension context: {}\nStatement: {}",
            signal.dimension.as_tag(),
            signal.text
        );

        for _attempt in 0..2 {
            match self.llm.generate(SYSTEM_PROMPT, &prompt).await {
                Ok(text) => {
                    if validate_generalization(&text).is_ok() {
                        return GeneralizedSignal {
                            signal_id: signal.id,
                            dimension: signal.dimension,
                            generalized_text: text.trim().to_string(),
                            used_fallback: false,
                            model_id: self.model_id.clone(),
                            prompt_version: PROMPT_VERSION.to_string(),
                            content_hash: soul_core::hash::sha256_hex(&signal.text),
                        };
                    }
                }
                Err(err) => {
                    debug!(error = %err, "generalization call failed, will fall back");
                    break;
                }
            }
        }

        GeneralizedSignal {
            signal_id: signal.id,
            dimension: signal.dimension,
            generalized_text: signal.text.clone(),
            used_fallback: true,
            model_id: self.model_id.clone(),
            prompt_version: PROMPT_VERSION.to_string(),
            content_hash: soul_core::hash::sha256_hex(&signal.text),
        }
    }

    /// Generalizes every signal independently, bounded by `batch_size`
    /// concurrent LLM calls in flight (spec §4.3: "callers supply a batch
    /// size"; spec §5: batch size governs max concurrency during
    /// generalization), then logs a reservoir-sampled subset of outcomes at
    /// debug level (spec §4.3 batching: "a reservoir sample of outcomes
    /// without duplicate indices").
    pub async fn generalize_batch(&self, signals: &[Signal], batch_size: usize, debug_sample_size: usize) -> Vec<GeneralizedSignal> {
        let semaphore = Semaphore::new(batch_size.max(1));
        let tasks = signals.iter().map(|signal| async {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            self.generalize_one(signal).await
        });
        let results = futures::future::join_all(tasks).await;

        for index in reservoir_sample_indices(results.len(), debug_sample_size) {
            let outcome = &results[index];
            debug!(
                signal_id = %outcome.signal_id,
                used_fallback = outcome.used_fallback,
                text = %outcome.generalized_text,
                "generalization sample"
            );
        }

        results
    }
}

/// Algorithm R reservoir sampling: returns up to `k` distinct indices in
/// `0..n`, each index equally likely to be chosen.
fn reservoir_sample_indices(n: usize, k: usize) -> Vec<usize> {
    if k == 0 || n == 0 {
        return Vec::new();
    }

    let mut reservoir: Vec<usize> = (0..n.min(k)).collect();
    let mut rng = rand::thread_rng();

    for i in k..n {
        let j = rng.gen_range(0..=i);
        if j < k {
            reservoir[j] = i;
        }
    }

    reservoir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservoir_sample_has_no_duplicates() {
        let indices = reservoir_sample_indices(100, 10);
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(indices.len(), sorted.len());
        assert_eq!(indices.len(), 10);
    }

    #[test]
    fn reservoir_sample_caps_at_population_size() {
        let indices = reservoir_sample_indices(3, 10);
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn reservoir_sample_empty_population() {
        assert!(reservoir_sample_indices(0, 5).is_empty());
    }
}
