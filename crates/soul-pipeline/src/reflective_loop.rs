//! The reflective loop (spec §4.7): a single, non-iterative pass through
//! every downstream component in a fixed sequence.

use soul_compress::compress;
use soul_core::{
    ArtifactCategory, CascadeLevel, DerivedSignalRef, GeneralizedSignal, RunConfig, RunMetrics, RunResult, Signal,
};
use soul_extract::Extractor;
use soul_generalize::{GeneralizationCache, Generalizer};
use soul_llm::SoulLlm;
use soul_principles::PrincipleStore;
use soul_tension::TensionDetector;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// Source material for one run (spec §4.7 step 1: "memory files + optional
/// existing artifact + optional interview outputs"). The existing artifact
/// (prior soul state) is consumed by the cycle manager, not here — the
/// reflective loop only ever sees fresh sources.
pub struct PipelineInput {
    pub memory_root: PathBuf,
    pub interview_root: Option<PathBuf>,
    pub model_id: String,
}

/// Number of reservoir-sampled generalization outcomes logged at debug
/// level per run (spec §4.3 batching note).
const GENERALIZATION_DEBUG_SAMPLE: usize = 5;

/// Runs the full single pass once: collect -> extract -> merge interview
/// signals -> generalize -> ingest a fresh store -> compress -> detect
/// tensions -> compute metrics -> return. Spec §4.7's own design note and
/// §9's "resist the intuition" warning rule out looping this to a fixed
/// point: a second pass would re-ingest already-clustered signals against
/// themselves and collapse compression, which is why only one
/// `PrincipleStore` is ever constructed here.
pub async fn run(llm: &dyn SoulLlm, config: &RunConfig, input: &PipelineInput) -> RunResult {
    let signals = collect_signals(llm, config, input).await;

    if signals.is_empty() {
        info!("no signals extracted, returning an empty run result");
        return RunResult {
            signals,
            principles: Vec::new(),
            axioms: Vec::new(),
            metrics: RunMetrics::default(),
            skipped: false,
        };
    }

    let cache = GeneralizationCache::new();
    let generalizer = Generalizer::new(llm, &cache, &input.model_id);
    let generalized = generalizer
        .generalize_batch(&signals, config.llm_concurrency, GENERALIZATION_DEBUG_SAMPLE)
        .await;

    let mut store = PrincipleStore::new(config.similarity_threshold);
    for (signal, generalized_signal) in signals.iter().zip(generalized.iter()) {
        let evidence = derived_signal_ref(signal, generalized_signal);
        store.ingest(llm, generalized_signal, evidence).await;
    }
    let principles = store.into_principles();

    let compression = compress(&principles, config, signals.len());
    let mut axioms = compression.axioms;

    let tension_detector = TensionDetector::new(llm);
    tension_detector.detect(&mut axioms, config.tension_axiom_cap).await;

    let metrics = compute_metrics(&signals, &generalized, &principles, &axioms, compression.cascade_level);

    RunResult {
        signals,
        principles,
        axioms,
        metrics,
        skipped: false,
    }
}

/// Steps 1-3: walk the memory root, then merge in interview-derived
/// signals if an interview output root was provided (spec §4.7 steps 1-3).
async fn collect_signals(llm: &dyn SoulLlm, config: &RunConfig, input: &PipelineInput) -> Vec<Signal> {
    let extractor = Extractor::new(llm, config.llm_concurrency);

    let mut signals = extractor
        .extract_with_category(&input.memory_root, ArtifactCategory::Memory)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "memory extraction failed, proceeding with zero memory signals");
            Vec::new()
        });

    if let Some(interview_root) = &input.interview_root {
        let interview_signals = extractor
            .extract_with_category(interview_root, ArtifactCategory::Interview)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "interview extraction failed, proceeding without interview signals");
                Vec::new()
            });
        signals.extend(interview_signals);
    }

    signals
}

fn derived_signal_ref(signal: &Signal, generalized: &GeneralizedSignal) -> DerivedSignalRef {
    DerivedSignalRef {
        signal_id: signal.id,
        // Overwritten by `PrincipleStore::ingest` once the actual best-match
        // confidence (or the founding 1.0) is known.
        similarity_confidence: 0.0,
        source: signal.source.clone(),
        original_text: signal.text.clone(),
        stance: signal.stance,
        importance: signal.importance,
        provenance: signal.provenance,
        elicitation: signal.elicitation,
    }
}

fn compute_metrics(
    signals: &[Signal],
    generalized: &[GeneralizedSignal],
    principles: &[soul_core::Principle],
    axioms: &[soul_core::Axiom],
    cascade_level: CascadeLevel,
) -> RunMetrics {
    let signal_count = signals.len();
    let axiom_count = axioms.len();

    let compression_ratio = if signal_count == 0 {
        0.0
    } else {
        axiom_count as f64 / signal_count as f64
    };

    // Generalization-stage fallback-to-original rate (spec §4.3: "an
    // aggregate fallback rate above 10% must be surfaced to the
    // operator"), not the extraction-stage classifier fallback flag.
    let fallback_count = generalized.iter().filter(|g| g.used_fallback).count();
    let fallback_rate = if generalized.is_empty() {
        0.0
    } else {
        fallback_count as f64 / generalized.len() as f64
    };

    let dimensions: HashSet<_> = axioms.iter().map(|a| a.dimension).collect();

    RunMetrics {
        signal_count,
        principle_count: principles.len(),
        axiom_count,
        compression_ratio,
        fallback_rate,
        dimension_coverage: dimensions.len(),
        cascade_level: Some(cascade_level_tag(cascade_level).to_string()),
    }
}

fn cascade_level_tag(level: CascadeLevel) -> &'static str {
    match level {
        CascadeLevel::AtLeastThree => "n>=3",
        CascadeLevel::AtLeastTwo => "n>=2",
        CascadeLevel::AtLeastOne => "n>=1",
    }
}
