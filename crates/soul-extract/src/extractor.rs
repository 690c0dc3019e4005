//! Signal extractor (spec §4.2): recursive traversal, candidate line
//! filtering, and per-signal metadata classification bounded by a shared
//! concurrency window.

use crate::candidate::extract_candidate;
use crate::error::ExtractResult;
use crate::origin::classify_origin;
use crate::path_safety::{is_symlink, is_within_root};
use chrono::Utc;
use soul_classify::{self_healing_classify, ClassifyTask};
use soul_core::{
    ArtifactCategory, Dimension, Elicitation, Importance, Provenance, Signal, SignalId,
    SignalSource, Stance,
};
use soul_llm::SoulLlm;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use walkdir::WalkDir;

const IDENTITY_FILTER_INSTRUCTION: &str =
    "Does the following line express an identity-bearing statement: a belief, value, trait, boundary, or habit the author holds about themself? Answer yes or no.";
const STANCE_INSTRUCTION: &str =
    "Classify the stance this statement takes toward the value or trait it expresses.";
const IMPORTANCE_INSTRUCTION: &str = "Classify how central this statement is to the author's identity.";
const ELICITATION_INSTRUCTION: &str = "Classify how this statement was most likely elicited.";
const PROVENANCE_INSTRUCTION: &str = "Classify the origin of this statement.";
const DIMENSION_INSTRUCTION: &str =
    "Classify which identity dimension this statement most strongly expresses.";

const YES_NO: &[&str] = &["yes", "no"];

pub struct Extractor<'a> {
    llm: &'a dyn SoulLlm,
    semaphore: Arc<Semaphore>,
}

impl<'a> Extractor<'a> {
    pub fn new(llm: &'a dyn SoulLlm, concurrency: usize) -> Self {
        Self {
            llm,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Recursively walks `memory_root`, returning every extracted signal in
    /// traversal order (spec §5: ingestion order is meaningful downstream).
    /// Signals are tagged `ArtifactCategory::Memory`.
    pub async fn extract(&self, memory_root: &Path) -> ExtractResult<Vec<Signal>> {
        self.extract_with_category(memory_root, ArtifactCategory::Memory).await
    }

    /// Same traversal as [`Self::extract`], tagging every signal's
    /// `source.category` with `category` instead of assuming memory. Used
    /// to merge interview-derived output (spec §4.7 step 3 / §1's "treated
    /// as a source that writes memory files") as a distinct category
    /// without a second extractor implementation.
    pub async fn extract_with_category(&self, root: &Path, category: ArtifactCategory) -> ExtractResult<Vec<Signal>> {
        let mut signals = Vec::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "walk error, skipping entry");
                    continue;
                }
            };

            if is_symlink(entry.path()) {
                debug!(path = %entry.path().display(), "skipping symlink");
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            if !is_within_root(root, entry.path()) {
                warn!(path = %entry.path().display(), "rejecting path outside memory root");
                continue;
            }

            match self.extract_file(root, entry.path(), category).await {
                Ok(mut file_signals) => signals.append(&mut file_signals),
                Err(err) => warn!(path = %entry.path().display(), error = %err, "skipping file"),
            }
        }

        Ok(signals)
    }

    async fn extract_file(&self, root: &Path, path: &Path, category: ArtifactCategory) -> ExtractResult<Vec<Signal>> {
        let content = std::fs::read_to_string(path)?;
        let origin = classify_origin(root, path);
        let normalized_path = path.to_string_lossy().to_string();

        let mut candidates = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if let Some(text) = extract_candidate(line) {
                candidates.push((index + 1, text));
            }
        }

        let identity_bearing = self.filter_identity_bearing(candidates).await;

        let mut signals = Vec::with_capacity(identity_bearing.len());
        for (line_number, text) in identity_bearing {
            let signal = self
                .classify_signal(&normalized_path, line_number, text, &origin, path, category)
                .await;
            signals.push(signal);
        }

        Ok(signals)
    }

    async fn filter_identity_bearing(&self, candidates: Vec<(usize, String)>) -> Vec<(usize, String)> {
        let tasks = candidates.into_iter().map(|(line_number, text)| {
            let semaphore = self.semaphore.clone();
            let llm = self.llm;
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                let task = ClassifyTask {
                    instruction: IDENTITY_FILTER_INSTRUCTION,
                    categories: YES_NO,
                    input: &text,
                };
                match self_healing_classify(llm, task).await {
                    Ok(Some(answer)) if answer == "yes" => Some((line_number, text)),
                    Ok(_) => None,
                    Err(err) => {
                        warn!(error = %err, "identity-bearing filter call failed, dropping candidate");
                        None
                    }
                }
            }
        });

        futures::future::join_all(tasks).await.into_iter().flatten().collect()
    }

    async fn classify_signal(
        &self,
        normalized_path: &str,
        line_number: usize,
        text: String,
        origin: &str,
        file_path: &Path,
        category: ArtifactCategory,
    ) -> Signal {
        let (stance_raw, importance_raw, elicitation_raw, provenance_raw, dimension_raw) = tokio::join!(
            self.classify_one(STANCE_INSTRUCTION, &["assert", "deny", "question", "qualify", "tensioning"], &text),
            self.classify_one(IMPORTANCE_INSTRUCTION, &["core", "supporting", "peripheral"], &text),
            self.classify_one(
                ELICITATION_INSTRUCTION,
                &["agent-initiated", "user-elicited", "context-dependent", "consistent-across-context"],
                &text
            ),
            self.classify_one(PROVENANCE_INSTRUCTION, &["self", "curated", "external"], &text),
            self.classify_one(DIMENSION_INSTRUCTION, &Dimension::ALL.map(|d| d.as_tag()), &text),
        );

        let mut uncertain = false;

        let stance = stance_raw
            .and_then(|tag| Stance::from_tag(&tag))
            .unwrap_or_else(|| {
                uncertain = true;
                Stance::default()
            });
        let importance = importance_raw
            .and_then(|tag| Importance::from_tag(&tag))
            .unwrap_or_else(|| {
                uncertain = true;
                Importance::default()
            });
        let elicitation = elicitation_raw
            .and_then(|tag| Elicitation::from_tag(&tag))
            .unwrap_or_else(|| {
                uncertain = true;
                Elicitation::default()
            });
        let provenance = provenance_raw
            .and_then(|tag| Provenance::from_tag(&tag))
            .unwrap_or_else(|| {
                uncertain = true;
                Provenance::default()
            });
        let dimension = dimension_raw.and_then(|tag| Dimension::from_tag(&tag)).unwrap_or_else(|| {
            uncertain = true;
            Dimension::IdentityCore
        });

        let source = SignalSource {
            file_path: file_path.to_path_buf(),
            line_number,
            extracted_at: Utc::now(),
            category,
            origin: origin.to_string(),
            context_snippet: text.clone(),
        };

        Signal {
            id: SignalId::from_content(normalized_path, text.trim()),
            text,
            dimension,
            stance,
            importance,
            elicitation,
            provenance,
            source,
            uncertain,
        }
    }

    /// Runs one classifier under the shared semaphore, returning `None` on
    /// either an unresolved classification or a persistent LLM failure —
    /// both are handled identically here (documented-default fallback,
    /// signal tagged uncertain), per spec §4.2's failure semantics.
    async fn classify_one(&self, instruction: &str, categories: &[&str], text: &str) -> Option<String> {
        let _permit = self.semaphore.acquire().await.expect("semaphore never closed");
        let task = ClassifyTask {
            instruction,
            categories,
            input: text,
        };
        match self_healing_classify(self.llm, task).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "metadata classifier call failed, falling back to default");
                None
            }
        }
    }
}
