//! Single-pass principle store (spec §4.4).

use soul_core::{Centrality, DerivedSignalRef, EntityId, GeneralizedSignal, Importance, Principle, SignalId};
use soul_llm::provider::{BestOfNOutcome, LlmResult};
use soul_llm::SoulLlm;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Candidates per best-match LLM call (spec §4.4 step 2: "≤10 candidates
/// per LLM call").
const PAGE_CAP: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The signal-id had already been processed this run; skipped.
    Duplicate,
    /// Matched an existing principle at or above the similarity threshold.
    Reinforced { principle_id: EntityId },
    /// No sufficiently similar principle existed; a new one was seeded.
    Created { principle_id: EntityId },
}

pub struct PrincipleStore {
    similarity_threshold: f64,
    principles: Vec<Principle>,
    processed: HashSet<SignalId>,
}

impl PrincipleStore {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
            principles: Vec::new(),
            processed: HashSet::new(),
        }
    }

    pub fn principles(&self) -> &[Principle] {
        &self.principles
    }

    pub fn into_principles(self) -> Vec<Principle> {
        self.principles
    }

    /// Total distinct signals ingested — must equal the sum of every
    /// principle's `n_count` (spec §8 single-pass invariant).
    pub fn ingested_count(&self) -> usize {
        self.processed.len()
    }

    /// Ingests one generalized signal. Never reprocesses a signal-id
    /// already committed this run (spec §4.4 invariant: single-pass).
    pub async fn ingest(
        &mut self,
        llm: &dyn SoulLlm,
        generalized: &GeneralizedSignal,
        mut evidence: DerivedSignalRef,
    ) -> IngestOutcome {
        if self.processed.contains(&generalized.signal_id) {
            debug!(signal_id = %generalized.signal_id, "duplicate signal-id, skipping");
            return IngestOutcome::Duplicate;
        }

        let best_match = self.find_best_match(llm, &generalized.generalized_text).await;

        let outcome = match best_match {
            Some((index, confidence)) => {
                evidence.similarity_confidence = confidence;
                self.reinforce(index, evidence);
                IngestOutcome::Reinforced {
                    principle_id: self.principles[index].id,
                }
            }
            None => {
                evidence.similarity_confidence = 1.0;
                let principle_id = self.create(generalized, evidence);
                IngestOutcome::Created { principle_id }
            }
        };

        // Commit-after-success: the signal is only marked processed once
        // the decision above has fully completed (spec §4.4 step 4).
        self.processed.insert(generalized.signal_id);
        outcome
    }

    /// Returns the index of the best-matching existing principle, or
    /// `None` if no candidate cleared the similarity threshold. A
    /// persistent comparator failure is treated as "no match" (spec §4.4:
    /// "safer than false-reinforcement").
    async fn find_best_match(&self, llm: &dyn SoulLlm, target: &str) -> Option<(usize, f64)> {
        if self.principles.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;

        for (page_index, page) in self.principles.chunks(PAGE_CAP).enumerate() {
            let page_start = page_index * PAGE_CAP;
            let candidate_texts: Vec<&str> = page.iter().map(|p| p.text.as_str()).collect();

            match llm.compare_best_of_n(target, &candidate_texts).await {
                Ok(outcome) => {
                    self.fold_best_of_n(page_start, outcome, &mut best);
                }
                Err(err) => {
                    warn!(error = %err, "best-of-n comparator failed, falling back to pairwise for this page");
                    if let Ok(Some((index, confidence))) =
                        self.pairwise_fallback(llm, target, page, page_start).await
                    {
                        Self::fold_candidate(index, confidence, &mut best);
                    }
                }
            }
        }

        best.filter(|(_, confidence)| *confidence >= self.similarity_threshold)
    }

    fn fold_best_of_n(&self, page_start: usize, outcome: BestOfNOutcome, best: &mut Option<(usize, f64)>) {
        if outcome.malformed {
            return;
        }
        if let Some(relative_index) = outcome.index {
            Self::fold_candidate(page_start + relative_index, outcome.confidence, best);
        }
    }

    fn fold_candidate(index: usize, confidence: f64, best: &mut Option<(usize, f64)>) {
        let replace = match best {
            Some((_, current)) => confidence > *current,
            None => true,
        };
        if replace {
            *best = Some((index, confidence));
        }
    }

    /// Per-pair equivalence fallback, used when a page's batched
    /// best-of-N call returns an unparseable response (spec §4.4 step 2's
    /// documented alternative: "accept the first match whose confidence
    /// exceeds the floor").
    async fn pairwise_fallback(
        &self,
        llm: &dyn SoulLlm,
        target: &str,
        page: &[Principle],
        page_start: usize,
    ) -> LlmResult<Option<(usize, f64)>> {
        for (offset, principle) in page.iter().enumerate() {
            match llm.compare(target, &principle.text).await {
                Ok(outcome) if outcome.equivalent && outcome.confidence >= self.similarity_threshold => {
                    return Ok(Some((page_start + offset, outcome.confidence)));
                }
                Ok(_) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    fn reinforce(&mut self, index: usize, evidence: DerivedSignalRef) {
        let principle = &mut self.principles[index];
        principle.derived_from.push(evidence);
        principle.n_count = principle.derived_from.len();
        principle.centrality = compute_centrality(&principle.derived_from);
    }

    fn create(&mut self, generalized: &GeneralizedSignal, evidence: DerivedSignalRef) -> EntityId {
        let id = EntityId::new();
        let derived_from = vec![evidence];
        let centrality = compute_centrality(&derived_from);
        self.principles.push(Principle {
            id,
            text: generalized.generalized_text.clone(),
            dimension: generalized.dimension,
            n_count: derived_from.len(),
            derived_from,
            centrality,
            similarity_threshold: self.similarity_threshold,
            intentionally_introspective: false,
        });
        id
    }
}

/// Dominant importance-weighted class, tied toward the less-central tier
/// (spec §4.4 invariant): core 1.5x, supporting 1.0x, peripheral 0.5x.
fn compute_centrality(derived_from: &[DerivedSignalRef]) -> Centrality {
    let mut core_weight = 0.0;
    let mut supporting_weight = 0.0;
    let mut peripheral_weight = 0.0;

    for signal in derived_from {
        match signal.importance {
            Importance::Core => core_weight += Importance::Core.weight(),
            Importance::Supporting => supporting_weight += Importance::Supporting.weight(),
            Importance::Peripheral => peripheral_weight += Importance::Peripheral.weight(),
        }
    }

    let candidates = [
        (Centrality::Defining, core_weight),
        (Centrality::Significant, supporting_weight),
        (Centrality::Contextual, peripheral_weight),
    ];
    let max_weight = candidates.iter().map(|(_, w)| *w).fold(f64::MIN, f64::max);

    candidates
        .into_iter()
        .filter(|(_, w)| (*w - max_weight).abs() < f64::EPSILON)
        .map(|(c, _)| c)
        .last()
        .unwrap_or(Centrality::Contextual)
}
