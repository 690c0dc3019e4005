//! Generalization cache (spec §4.3): LRU keyed by `(signal-id, sha256(text),
//! prompt-version, model-id)` so edits to source text and model swaps
//! invalidate transparently — the cache key carries the model identifier
//! (spec §9: the source once omitted this, causing silent cross-model
//! reuse).
//!
//! `lru::LruCache` is not `Sync` on its own; spec §5 explicitly calls out
//! that a preemptive thread model requires wrapping it in a mutex (the
//! source assumed a single-threaded scheduler). Tokio's default runtime is
//! multi-threaded, so it is wrapped here.

use lru::LruCache;
use soul_core::hash::sha256_hex;
use soul_core::{GeneralizedSignal, SignalId};
use std::num::NonZeroUsize;
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 1000;

pub struct GeneralizationCache {
    inner: Mutex<LruCache<String, GeneralizedSignal>>,
}

impl GeneralizationCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1"),
            )),
        }
    }

    pub fn key(signal_id: &SignalId, text: &str, prompt_version: &str, model_id: &str) -> String {
        format!("{signal_id}:{}:{prompt_version}:{model_id}", sha256_hex(text))
    }

    pub fn get(&self, key: &str) -> Option<GeneralizedSignal> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: String, value: GeneralizedSignal) {
        self.inner.lock().unwrap().put(key, value);
    }
}

impl Default for GeneralizationCache {
    fn default() -> Self {
        Self::new()
    }
}
