//! Promotion cascade and grounding predicate (spec §4.5).

use soul_core::{Axiom, AxiomDerivation, CascadeLevel, Centrality, Dimension, EntityId, Principle, Provenance, RunConfig, Stance};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

const CASCADE_LEVELS: [(CascadeLevel, usize); 3] = [
    (CascadeLevel::AtLeastThree, 3),
    (CascadeLevel::AtLeastTwo, 2),
    (CascadeLevel::AtLeastOne, 1),
];

pub struct CompressionResult {
    pub axioms: Vec<Axiom>,
    pub cascade_level: CascadeLevel,
}

/// Runs the full N>=3 -> N>=2 -> N>=1 cascade against `principles`, applying
/// the grounding predicate first and the cognitive-load cap last.
/// `total_signal_count` enforces the axiom-count <= signal-count invariant.
pub fn compress(principles: &[Principle], config: &RunConfig, total_signal_count: usize) -> CompressionResult {
    let eligible: Vec<&Principle> = principles.iter().filter(|p| grounding_predicate(p)).collect();

    for (index, (level, threshold)) in CASCADE_LEVELS.iter().enumerate() {
        let candidates: Vec<&Principle> = eligible.iter().copied().filter(|p| p.n_count >= *threshold).collect();
        let is_last_level = index == CASCADE_LEVELS.len() - 1;

        if candidates.len() >= config.minimum_viable_yield || is_last_level {
            let ordered = order_by_priority(candidates);
            let cap = config.axiom_cap.min(total_signal_count);
            if ordered.len() > cap {
                debug!(dropped = ordered.len() - cap, "axiom cascade truncated to cognitive-load cap");
            }
            let axioms = ordered.into_iter().take(cap).map(to_axiom).collect();
            return CompressionResult {
                axioms,
                cascade_level: *level,
            };
        }
    }

    unreachable!("N>=1 is always the final cascade level and always accepted")
}

/// Anti-echo-chamber predicate (spec §4.5). Missing provenance is already
/// normalized to `self` by `soul_core::Provenance`'s default, so no
/// additional guard is needed here beyond treating that default correctly.
pub fn grounding_predicate(principle: &Principle) -> bool {
    let has_outside_voice_or_question = principle
        .derived_from
        .iter()
        .any(|s| s.provenance == Provenance::External || s.stance == Stance::Question);

    let has_non_self_provenance = principle.derived_from.iter().any(|s| s.provenance != Provenance::SelfAuthored);

    has_outside_voice_or_question && (has_non_self_provenance || principle.intentionally_introspective)
}

fn weighted_n_count(principle: &Principle) -> f64 {
    principle.derived_from.iter().map(|s| s.importance.weight()).sum()
}

fn centrality_score(centrality: Centrality) -> u8 {
    match centrality {
        Centrality::Defining => 2,
        Centrality::Significant => 1,
        Centrality::Contextual => 0,
    }
}

/// Descending sort by (a) importance-weighted n_count, (b) centrality tier,
/// (c) dimension coverage parity — greedily recomputed after each pick since
/// "underrepresented so far" depends on what has already been selected.
fn order_by_priority(mut remaining: Vec<&Principle>) -> Vec<&Principle> {
    let mut dimension_counts: HashMap<Dimension, usize> = HashMap::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let best_position = remaining
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| compare_priority(a, b, &dimension_counts))
            .map(|(index, _)| index)
            .expect("remaining is non-empty");

        let chosen = remaining.remove(best_position);
        *dimension_counts.entry(chosen.dimension).or_insert(0) += 1;
        ordered.push(chosen);
    }

    ordered
}

fn compare_priority(a: &Principle, b: &Principle, dimension_counts: &HashMap<Dimension, usize>) -> Ordering {
    weighted_n_count(a)
        .total_cmp(&weighted_n_count(b))
        .then_with(|| centrality_score(a.centrality).cmp(&centrality_score(b.centrality)))
        .then_with(|| {
            let count_a = dimension_counts.get(&a.dimension).copied().unwrap_or(0);
            let count_b = dimension_counts.get(&b.dimension).copied().unwrap_or(0);
            // Fewer prior picks in this dimension is better, so reverse the comparison.
            count_b.cmp(&count_a)
        })
}

fn to_axiom(principle: &Principle) -> Axiom {
    Axiom {
        id: EntityId::new(),
        text: principle.text.clone(),
        dimension: principle.dimension,
        derived_from: AxiomDerivation {
            principle_id: principle.id,
            signals: principle.derived_from.clone(),
        },
        tensions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_core::{ArtifactCategory, DerivedSignalRef, Elicitation, Importance, SignalId, SignalSource};
    use std::path::PathBuf;

    fn evidence(provenance: Provenance, stance: Stance, importance: Importance) -> DerivedSignalRef {
        DerivedSignalRef {
            signal_id: SignalId::from_content("diary.md", "x"),
            similarity_confidence: 1.0,
            source: SignalSource {
                file_path: PathBuf::from("diary.md"),
                line_number: 1,
                extracted_at: chrono::Utc::now(),
                category: ArtifactCategory::Memory,
                origin: "diary".to_string(),
                context_snippet: "".to_string(),
            },
            original_text: "".to_string(),
            stance,
            importance,
            provenance,
            elicitation: Elicitation::UserElicited,
        }
    }

    fn principle(
        dimension: Dimension,
        n_count: usize,
        centrality: Centrality,
        derived_from: Vec<DerivedSignalRef>,
        intentionally_introspective: bool,
    ) -> Principle {
        Principle {
            id: EntityId::new(),
            text: "text".to_string(),
            dimension,
            n_count,
            derived_from,
            centrality,
            similarity_threshold: 0.75,
            intentionally_introspective,
        }
    }

    #[test]
    fn pure_self_assertion_fails_the_grounding_predicate() {
        let p = principle(
            Dimension::IdentityCore,
            2,
            Centrality::Defining,
            vec![
                evidence(Provenance::SelfAuthored, Stance::Assert, Importance::Core),
                evidence(Provenance::SelfAuthored, Stance::Assert, Importance::Core),
            ],
            false,
        );
        assert!(!grounding_predicate(&p));
    }

    #[test]
    fn external_provenance_satisfies_the_predicate() {
        let p = principle(
            Dimension::IdentityCore,
            2,
            Centrality::Defining,
            vec![
                evidence(Provenance::External, Stance::Assert, Importance::Core),
                evidence(Provenance::SelfAuthored, Stance::Assert, Importance::Core),
            ],
            false,
        );
        assert!(grounding_predicate(&p));
    }

    #[test]
    fn question_stance_alone_without_non_self_provenance_fails() {
        let p = principle(
            Dimension::IdentityCore,
            2,
            Centrality::Defining,
            vec![evidence(Provenance::SelfAuthored, Stance::Question, Importance::Core)],
            false,
        );
        assert!(!grounding_predicate(&p));
    }

    #[test]
    fn question_stance_with_operator_escape_hatch_satisfies_the_predicate() {
        let p = principle(
            Dimension::IdentityCore,
            2,
            Centrality::Defining,
            vec![evidence(Provenance::SelfAuthored, Stance::Question, Importance::Core)],
            true,
        );
        assert!(grounding_predicate(&p));
    }

    #[test]
    fn cascade_relaxes_when_n_ge_3_yields_too_few() {
        let config = RunConfig {
            minimum_viable_yield: 3,
            axiom_cap: 25,
            ..RunConfig::default()
        };
        let grounded = vec![
            principle(
                Dimension::IdentityCore,
                2,
                Centrality::Defining,
                vec![evidence(Provenance::External, Stance::Assert, Importance::Core)],
                false,
            ),
            principle(
                Dimension::VoicePresence,
                2,
                Centrality::Significant,
                vec![evidence(Provenance::External, Stance::Assert, Importance::Core)],
                false,
            ),
        ];
        let result = compress(&grounded, &config, 10);
        assert_eq!(result.cascade_level, CascadeLevel::AtLeastTwo);
        assert_eq!(result.axioms.len(), 2);
    }

    #[test]
    fn axiom_count_never_exceeds_signal_count() {
        let config = RunConfig {
            minimum_viable_yield: 1,
            axiom_cap: 25,
            ..RunConfig::default()
        };
        let grounded: Vec<Principle> = (0..5)
            .map(|_| {
                principle(
                    Dimension::IdentityCore,
                    3,
                    Centrality::Defining,
                    vec![evidence(Provenance::External, Stance::Assert, Importance::Core)],
                    false,
                )
            })
            .collect();
        let result = compress(&grounded, &config, 2);
        assert!(result.axioms.len() <= 2);
    }

    proptest::proptest! {
        /// Spec §8 testable property: compression must never expand —
        /// axiom count stays within both the cognitive-load cap and the
        /// total signal count, across randomly generated n_count/importance
        /// distributions.
        #[test]
        fn axiom_count_is_bounded_for_arbitrary_principle_sets(
            n_counts in proptest::collection::vec(1usize..8, 0..20),
        ) {
            let total_signals: usize = n_counts.iter().sum::<usize>().max(1);
            let grounded: Vec<Principle> = n_counts
                .iter()
                .map(|&n| {
                    let derived_from = (0..n)
                        .map(|_| evidence(Provenance::External, Stance::Assert, Importance::Core))
                        .collect();
                    principle(Dimension::IdentityCore, n, Centrality::Defining, derived_from, false)
                })
                .collect();
            let config = RunConfig {
                minimum_viable_yield: 1,
                axiom_cap: 25,
                ..RunConfig::default()
            };

            let result = compress(&grounded, &config, total_signals);

            proptest::prop_assert!(result.axioms.len() <= config.axiom_cap);
            proptest::prop_assert!(result.axioms.len() <= total_signals);
        }
    }

    #[test]
    fn ordering_prefers_underrepresented_dimensions_on_tie() {
        let tie_signals = || vec![evidence(Provenance::External, Stance::Assert, Importance::Core)];
        let a = principle(Dimension::IdentityCore, 1, Centrality::Defining, tie_signals(), false);
        let b = principle(Dimension::IdentityCore, 1, Centrality::Defining, tie_signals(), false);
        let c = principle(Dimension::VoicePresence, 1, Centrality::Defining, tie_signals(), false);
        let ordered = order_by_priority(vec![&a, &b, &c]);
        // first two picks are tied on every static key; the third (same
        // dimension as the first two) must fall behind the dimension that
        // has not yet been picked.
        assert_ne!(ordered[0].dimension, ordered[2].dimension);
    }
}
