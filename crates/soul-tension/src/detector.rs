//! Tension detector (spec §4.6): pairwise LLM comparison over axioms,
//! attaching structured conflicts without clobbering existing ones.

use serde::Deserialize;
use soul_core::{Axiom, Severity, Tension};
use soul_llm::SoulLlm;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "\
You compare two stated personal values for genuine conflict. Respond with only a JSON \
object: {\"tension\": true|false, \"description\": \"...\", \"severity\": \"high\"|\"medium\"|\"low\"}. \
Set tension to false if the two values are compatible, aligned, or not in conflict. Only set \
tension to true for a real, describable disagreement in what the two values would ask someone \
to do.";

/// Minimum length (after trimming) for a tension description before it is
/// accepted — rejects unstructured short affirmatives (spec §4.6: "reject
/// very short affirmatives that lack structure").
const MIN_DESCRIPTION_LEN: usize = 8;

/// Phrases that mark an explicit no-tension verdict, checked instead of any
/// length heuristic (spec §4.6).
const NO_TENSION_PHRASES: [&str; 4] = ["no tension", "no conflict", "aligned", "compatible"];

#[derive(Debug, Deserialize)]
struct TensionEnvelope {
    tension: bool,
    description: Option<String>,
    severity: Option<String>,
}

pub struct TensionDetector<'a> {
    llm: &'a dyn SoulLlm,
}

impl<'a> TensionDetector<'a> {
    pub fn new(llm: &'a dyn SoulLlm) -> Self {
        Self { llm }
    }

    /// Enumerates unordered axiom pairs and attaches detected tensions to
    /// both sides. Skips detection entirely, with a log line, once
    /// `axioms.len()` exceeds `axiom_cap` (spec §4.6 hard cap).
    pub async fn detect(&self, axioms: &mut [Axiom], axiom_cap: usize) {
        if axioms.len() > axiom_cap {
            warn!(
                axiom_count = axioms.len(),
                cap = axiom_cap,
                "axiom count exceeds tension-detection cap, skipping entirely"
            );
            return;
        }

        for i in 0..axioms.len() {
            for j in (i + 1)..axioms.len() {
                let found = self.evaluate_pair(&axioms[i], &axioms[j]).await;
                if let Some((description, severity)) = found {
                    let peer_of_i = axioms[j].id;
                    let peer_of_j = axioms[i].id;
                    attach_tension(
                        &mut axioms[i].tensions,
                        Tension {
                            peer_axiom_id: peer_of_i,
                            description: description.clone(),
                            severity,
                        },
                    );
                    attach_tension(
                        &mut axioms[j].tensions,
                        Tension {
                            peer_axiom_id: peer_of_j,
                            description,
                            severity,
                        },
                    );
                }
            }
        }
    }

    async fn evaluate_pair(&self, a: &Axiom, b: &Axiom) -> Option<(String, Severity)> {
        let prompt = format!("Value A: {}\nValue B: {}", a.text, b.text);
        match self.llm.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => parse_tension_response(&text),
            Err(err) => {
                debug!(error = %err, "tension comparator failed, treating pair as no-tension");
                None
            }
        }
    }
}

/// Merges a new tension into `existing` instead of overwriting the list
/// (spec §4.6: "the naive overwrite was a past regression"). A repeat
/// detection against the same peer axiom replaces that entry rather than
/// duplicating it.
fn attach_tension(existing: &mut Vec<Tension>, new_tension: Tension) {
    if let Some(slot) = existing.iter_mut().find(|t| t.peer_axiom_id == new_tension.peer_axiom_id) {
        *slot = new_tension;
    } else {
        existing.push(new_tension);
    }
}

fn parse_tension_response(raw: &str) -> Option<(String, Severity)> {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    if NO_TENSION_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return None;
    }

    let json_slice = extract_json_object(trimmed)?;
    let envelope: TensionEnvelope = serde_json::from_str(json_slice).ok()?;

    if !envelope.tension {
        return None;
    }

    let description = envelope.description?.trim().to_string();
    if description.len() < MIN_DESCRIPTION_LEN {
        return None;
    }

    let severity = match envelope.severity.as_deref().map(str::to_lowercase).as_deref() {
        Some("high") => Severity::High,
        Some("low") => Severity::Low,
        _ => Severity::Medium,
    };

    Some((description, severity))
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
