//! Run-necessity gate (spec §4.8): a cycle only runs the full pipeline
//! when forced, when the memory corpus has materially changed, or when a
//! sampled contradiction check against the prior axiom set turns up a
//! genuine conflict.

use soul_classify::{self_healing_classify, ClassifyTask};
use soul_core::{Axiom, Signal};
use soul_llm::SoulLlm;
use std::collections::HashSet;
use tracing::debug;

/// Minimum word-overlap before a signal/axiom pair is even considered a
/// contradiction candidate. Below this, the LLM call would almost always
/// come back "unrelated" — not worth the round trip.
const MIN_OVERLAP: f64 = 0.2;

/// Caps the number of candidate pairs actually sent to the LLM per gate
/// check (spec §4.8: "a sampled subset", not an exhaustive cross product).
const MAX_CANDIDATES: usize = 5;

const NEGATION_MARKERS: &[&str] = &["not ", "never ", "no longer", " no ", "isn't", "doesn't", "won't"];

/// True if the cycle must run: forced, the corpus hash moved, or a
/// contradiction sample found a real conflict.
pub fn should_run(force_resynthesis: bool, hash_changed: bool, contradiction_found: bool) -> bool {
    force_resynthesis || hash_changed || contradiction_found
}

/// Samples token-overlapping (axiom, signal) pairs and asks the model
/// whether each pair is a genuine contradiction, falling back to a lexical
/// Jaccard + negation-pattern heuristic when the LLM call itself fails
/// (spec §4.8: "a lexical fallback when the LLM call is unavailable").
/// Returns `true` on the first confirmed contradiction.
pub async fn detect_contradiction(llm: &dyn SoulLlm, axioms: &[Axiom], signals: &[Signal]) -> bool {
    let mut candidates: Vec<(&Axiom, &Signal, f64)> = Vec::new();
    for axiom in axioms {
        for signal in signals {
            let overlap = jaccard(&axiom.text, &signal.text);
            if overlap >= MIN_OVERLAP {
                candidates.push((axiom, signal, overlap));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
    candidates.truncate(MAX_CANDIDATES);

    for (axiom, signal, _overlap) in candidates {
        if evaluate_pair(llm, &axiom.text, &signal.text).await {
            debug!(axiom_id = %axiom.id, signal_id = %signal.id, "contradiction sample found a conflict");
            return true;
        }
    }
    false
}

async fn evaluate_pair(llm: &dyn SoulLlm, axiom_text: &str, signal_text: &str) -> bool {
    let input = format!("Statement A: {axiom_text}\nStatement B: {signal_text}");
    let task = ClassifyTask {
        instruction: "Does Statement B directly contradict the value expressed in Statement A?",
        categories: &["yes", "no"],
        input: &input,
    };

    match self_healing_classify(llm, task).await {
        Ok(Some(category)) => category == "yes",
        Ok(None) | Err(_) => lexical_contradiction_fallback(axiom_text, signal_text),
    }
}

fn lexical_contradiction_fallback(a: &str, b: &str) -> bool {
    if jaccard(a, b) < MIN_OVERLAP {
        return false;
    }
    contains_negation(a) != contains_negation(b)
}

fn contains_negation(text: &str) -> bool {
    let lower = text.to_lowercase();
    NEGATION_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn jaccard(a: &str, b: &str) -> f64 {
    let tokens = |text: &str| -> HashSet<String> {
        text.to_lowercase().split_whitespace().map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string()).filter(|w| !w.is_empty()).collect()
    };
    let set_a = tokens(a);
    let set_b = tokens(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
