//! Core types for the synthesis pipeline (spec §3: Data Model)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Fixed namespace for content-derived signal ids. Re-extracting the same
/// source line with identical content must yield the same `SignalId`
/// across runs (spec §3 invariant) — a random v4 id would not survive a
/// re-run, so signal ids are UUIDv5 over `(normalized_path, trimmed_text)`.
const SIGNAL_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x75, 0x6c, 0x2d, 0x73, 0x69, 0x67, 0x6e, 0x61, 0x6c, 0x2d, 0x6e, 0x73, 0x00, 0x00, 0x01,
]);

/// Opaque, content-derived identifier for a [`Signal`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignalId(Uuid);

impl SignalId {
    /// Derive a stable id from the originating file path and the signal's
    /// trimmed source text. Same inputs always produce the same id.
    pub fn from_content(normalized_path: &str, trimmed_text: &str) -> Self {
        let name = format!("{normalized_path}\u{0}{trimmed_text}");
        Self(Uuid::new_v5(&SIGNAL_NAMESPACE, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Random, run-scoped identifier for principles and axioms (no cross-run
/// stability requirement — only signals need content-derived ids).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The seven-tag identity-dimension taxonomy (spec §3).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    IdentityCore,
    CharacterTraits,
    VoicePresence,
    HonestyFramework,
    BoundariesEthics,
    RelationshipDynamics,
    ContinuityGrowth,
}

impl Dimension {
    /// All variants, in the order the spec lists them — used as the
    /// classifier's category set and for dimension-coverage scoring.
    pub const ALL: [Dimension; 7] = [
        Dimension::IdentityCore,
        Dimension::CharacterTraits,
        Dimension::VoicePresence,
        Dimension::HonestyFramework,
        Dimension::BoundariesEthics,
        Dimension::RelationshipDynamics,
        Dimension::ContinuityGrowth,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Dimension::IdentityCore => "identity-core",
            Dimension::CharacterTraits => "character-traits",
            Dimension::VoicePresence => "voice-presence",
            Dimension::HonestyFramework => "honesty-framework",
            Dimension::BoundariesEthics => "boundaries-ethics",
            Dimension::RelationshipDynamics => "relationship-dynamics",
            Dimension::ContinuityGrowth => "continuity-growth",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_tag() == tag)
    }
}

/// Stance a signal takes (spec §3). Default on classifier exhaustion is
/// `Qualify` (neutral) — spec §9 notes the source once defaulted to
/// `Assert` and that this affects downstream statistics.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stance {
    Assert,
    Deny,
    Question,
    Qualify,
    Tensioning,
}

impl Default for Stance {
    fn default() -> Self {
        Stance::Qualify
    }
}

impl Stance {
    pub const ALL: [Stance; 5] = [
        Stance::Assert,
        Stance::Deny,
        Stance::Question,
        Stance::Qualify,
        Stance::Tensioning,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Stance::Assert => "assert",
            Stance::Deny => "deny",
            Stance::Question => "question",
            Stance::Qualify => "qualify",
            Stance::Tensioning => "tensioning",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_tag() == tag)
    }
}

/// Signal importance tier (spec §3). Default: `Supporting`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Importance {
    Core,
    Supporting,
    Peripheral,
}

impl Default for Importance {
    fn default() -> Self {
        Importance::Supporting
    }
}

impl Importance {
    pub const ALL: [Importance; 3] = [Importance::Core, Importance::Supporting, Importance::Peripheral];

    /// Weight used by centrality computation (spec §4.4): core 1.5x,
    /// supporting 1.0x, peripheral 0.5x.
    pub fn weight(&self) -> f64 {
        match self {
            Importance::Core => 1.5,
            Importance::Supporting => 1.0,
            Importance::Peripheral => 0.5,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Importance::Core => "core",
            Importance::Supporting => "supporting",
            Importance::Peripheral => "peripheral",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_tag() == tag)
    }
}

/// How a signal was elicited (spec §3). Default: `UserElicited`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Elicitation {
    AgentInitiated,
    UserElicited,
    ContextDependent,
    ConsistentAcrossContext,
}

impl Default for Elicitation {
    fn default() -> Self {
        Elicitation::UserElicited
    }
}

impl Elicitation {
    pub const ALL: [Elicitation; 4] = [
        Elicitation::AgentInitiated,
        Elicitation::UserElicited,
        Elicitation::ContextDependent,
        Elicitation::ConsistentAcrossContext,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Elicitation::AgentInitiated => "agent-initiated",
            Elicitation::UserElicited => "user-elicited",
            Elicitation::ContextDependent => "context-dependent",
            Elicitation::ConsistentAcrossContext => "consistent-across-context",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_tag() == tag)
    }
}

/// Origin class of a source line (spec §3 / GLOSSARY "Provenance"). Default:
/// `SelfAuthored`. Missing/legacy data must be treated as `SelfAuthored`
/// (spec §4.5) rather than erroring.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    #[serde(rename = "self")]
    SelfAuthored,
    Curated,
    External,
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance::SelfAuthored
    }
}

impl Provenance {
    pub const ALL: [Provenance; 3] = [Provenance::SelfAuthored, Provenance::Curated, Provenance::External];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Provenance::SelfAuthored => "self",
            Provenance::Curated => "curated",
            Provenance::External => "external",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_tag() == tag)
    }
}

/// Category of the artifact a signal was pulled from (spec §3 `source.category`).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    Memory,
    Interview,
    Template,
}

/// Known memory-root subdirectory names that control origin classification
/// (spec §4.2 step 2).
pub const KNOWN_ORIGIN_CATEGORIES: &[&str] = &[
    "diary",
    "experiences",
    "goals",
    "knowledge",
    "relationships",
    "preferences",
];

/// Where a signal's source line came from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalSource {
    pub file_path: PathBuf,
    /// One-based line number, computed incrementally during extraction —
    /// never by re-scanning the file (spec §4.2 step 4).
    pub line_number: usize,
    pub extracted_at: DateTime<Utc>,
    pub category: ArtifactCategory,
    /// The origin subdirectory name if it matched [`KNOWN_ORIGIN_CATEGORIES`],
    /// else `"other"`.
    pub origin: String,
    pub context_snippet: String,
}

/// A candidate identity statement extracted from one source line (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub text: String,
    pub dimension: Dimension,
    pub stance: Stance,
    pub importance: Importance,
    pub elicitation: Elicitation,
    pub provenance: Provenance,
    pub source: SignalSource,
    /// Set when any metadata classifier exhausted its attempts and a
    /// documented default was applied (spec §4.2 failure semantics).
    pub uncertain: bool,
}

/// A normalized, actor-agnostic paraphrase of a [`Signal`] (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneralizedSignal {
    pub signal_id: SignalId,
    pub dimension: Dimension,
    pub generalized_text: String,
    pub used_fallback: bool,
    pub model_id: String,
    pub prompt_version: String,
    /// SHA-256 hex digest of the original signal text, part of the cache key.
    pub content_hash: String,
}

/// Evidence record retained inside a principle/axiom (spec §3 `derived_from.signals`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DerivedSignalRef {
    pub signal_id: SignalId,
    pub similarity_confidence: f64,
    pub source: SignalSource,
    pub original_text: String,
    pub stance: Stance,
    pub importance: Importance,
    pub provenance: Provenance,
    pub elicitation: Elicitation,
}

/// Principle-level centrality label (spec §3 / GLOSSARY).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Centrality {
    Defining,
    Significant,
    Contextual,
}

/// A cluster of generalized signals judged semantically equivalent (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principle {
    pub id: EntityId,
    /// Text of the seed generalized signal. Never rewritten after creation.
    pub text: String,
    pub dimension: Dimension,
    pub n_count: usize,
    pub derived_from: Vec<DerivedSignalRef>,
    pub centrality: Centrality,
    pub similarity_threshold: f64,
    /// Operator escape hatch for the grounding predicate (spec §4.5):
    /// principles the operator has tagged as intentionally introspective
    /// may promote without an external/questioning signal.
    pub intentionally_introspective: bool,
}

impl Principle {
    /// Invariant from spec §3: `n_count === derived_from.signals.length`.
    pub fn n_count_matches(&self) -> bool {
        self.n_count == self.derived_from.len()
    }
}

/// Severity label for a detected tension (spec §3 / §4.6).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A detected value conflict between two axioms (spec §3 / GLOSSARY).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tension {
    pub peer_axiom_id: EntityId,
    pub description: String,
    pub severity: Severity,
}

/// Provenance of an axiom: the principle it was promoted from, carried
/// alongside its signal evidence for full provenance from source line to
/// axiom (spec §1's "preserve provenance" guarantee).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxiomDerivation {
    pub principle_id: EntityId,
    pub signals: Vec<DerivedSignalRef>,
}

/// A promoted principle meeting the grounding and evidence predicates (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Axiom {
    pub id: EntityId,
    pub text: String,
    pub dimension: Dimension,
    pub derived_from: AxiomDerivation,
    pub tensions: Vec<Tension>,
}

/// The persisted cross-run artifact (spec §3 "Soul state").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoulState {
    pub format_version: u32,
    pub prior_axioms: Vec<Axiom>,
    pub prior_principles_summary: Vec<PrincipleSummary>,
    pub content_hash: String,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl SoulState {
    pub const CURRENT_FORMAT_VERSION: u32 = 1;

    pub fn empty() -> Self {
        Self {
            format_version: Self::CURRENT_FORMAT_VERSION,
            prior_axioms: Vec::new(),
            prior_principles_summary: Vec::new(),
            content_hash: String::new(),
            last_run_at: None,
        }
    }
}

/// Lightweight summary of a principle retained across runs, avoiding
/// re-persisting full derived-from evidence in the soul state document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrincipleSummary {
    pub id: EntityId,
    pub text: String,
    pub dimension: Dimension,
    pub n_count: usize,
}

/// Per-invocation configuration (spec §6 env knobs).
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Batch size governing max concurrent LLM calls (`LLM-concurrency`).
    pub llm_concurrency: usize,
    /// Per-call LLM timeout in milliseconds (`LLM-timeout-ms`).
    pub llm_timeout_ms: u64,
    /// Overrides the run-necessity gate (`force-resynthesis`).
    pub force_resynthesis: bool,
    /// LLM equivalence confidence floor (`similarity-threshold`).
    pub similarity_threshold: f64,
    /// Cognitive-load cap on promoted axioms (spec §4.5 default 25).
    pub axiom_cap: usize,
    /// Minimum viable yield before the cascade relaxes (spec §4.5 default 3).
    pub minimum_viable_yield: usize,
    /// Hard cap on axiom count for tension detection (spec §4.6 default 25).
    pub tension_axiom_cap: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            llm_concurrency: 10,
            llm_timeout_ms: 120_000,
            force_resynthesis: false,
            similarity_threshold: 0.75,
            axiom_cap: 25,
            minimum_viable_yield: 3,
            tension_axiom_cap: 25,
        }
    }
}

impl RunConfig {
    /// Read the documented env knobs, falling back to defaults on any
    /// invalid value (spec §4.2 step 6, §6).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("LLM-concurrency") {
            match raw.parse::<i64>() {
                Ok(n) if n > 0 => config.llm_concurrency = n as usize,
                _ => {
                    tracing::warn!(
                        "LLM-concurrency={:?} is invalid, falling back to default {}",
                        raw,
                        config.llm_concurrency
                    );
                }
            }
        }

        if let Ok(raw) = std::env::var("LLM-timeout-ms") {
            match raw.parse::<u64>() {
                Ok(n) if n > 0 => config.llm_timeout_ms = n,
                _ => {
                    tracing::warn!(
                        "LLM-timeout-ms={:?} is invalid, falling back to default {}",
                        raw,
                        config.llm_timeout_ms
                    );
                }
            }
        }

        if let Ok(raw) = std::env::var("force-resynthesis") {
            config.force_resynthesis = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(raw) = std::env::var("similarity-threshold") {
            match raw.parse::<f64>() {
                Ok(n) if (0.0..=1.0).contains(&n) => config.similarity_threshold = n,
                _ => {
                    tracing::warn!(
                        "similarity-threshold={:?} is invalid, falling back to default {}",
                        raw,
                        config.similarity_threshold
                    );
                }
            }
        }

        config
    }
}

/// Which cascade level the compressor settled on (spec §4.5 step 3).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CascadeLevel {
    AtLeastThree,
    AtLeastTwo,
    AtLeastOne,
}

/// Metrics computed for the run report (spec §4.7 step 8).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub signal_count: usize,
    pub principle_count: usize,
    pub axiom_count: usize,
    pub compression_ratio: f64,
    pub fallback_rate: f64,
    pub dimension_coverage: usize,
    pub cascade_level: Option<String>,
}

/// The result of one reflective-loop pass (spec §4.7 step 9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub signals: Vec<Signal>,
    pub principles: Vec<Principle>,
    pub axioms: Vec<Axiom>,
    pub metrics: RunMetrics,
    /// `true` when the cycle manager skipped this run entirely (spec §4.8).
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_id_is_stable_for_identical_content() {
        let a = SignalId::from_content("diary/today.md", "I tell the truth when it costs me.");
        let b = SignalId::from_content("diary/today.md", "I tell the truth when it costs me.");
        assert_eq!(a, b);
    }

    #[test]
    fn signal_id_differs_on_path_or_text_change() {
        let base = SignalId::from_content("diary/today.md", "I tell the truth.");
        let diff_path = SignalId::from_content("diary/other.md", "I tell the truth.");
        let diff_text = SignalId::from_content("diary/today.md", "I tell the truth, mostly.");
        assert_ne!(base, diff_path);
        assert_ne!(base, diff_text);
    }

    #[test]
    fn dimension_tag_roundtrip() {
        for d in Dimension::ALL {
            assert_eq!(Dimension::from_tag(d.as_tag()), Some(d));
        }
    }

    #[test]
    fn stance_default_is_qualify() {
        assert_eq!(Stance::default(), Stance::Qualify);
    }

    #[test]
    fn importance_weight_ordering() {
        assert!(Importance::Core.weight() > Importance::Supporting.weight());
        assert!(Importance::Supporting.weight() > Importance::Peripheral.weight());
    }

    #[test]
    fn provenance_default_is_self() {
        assert_eq!(Provenance::default(), Provenance::SelfAuthored);
    }

    #[test]
    fn principle_n_count_invariant() {
        let principle = Principle {
            id: EntityId::new(),
            text: "Values honesty".into(),
            dimension: Dimension::HonestyFramework,
            n_count: 1,
            derived_from: vec![],
            centrality: Centrality::Contextual,
            similarity_threshold: 0.75,
            intentionally_introspective: false,
        };
        assert!(!principle.n_count_matches());
    }

    #[test]
    fn run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.llm_concurrency, 10);
        assert_eq!(config.similarity_threshold, 0.75);
        assert_eq!(config.minimum_viable_yield, 3);
    }

    #[test]
    fn run_config_from_env_rejects_invalid_concurrency() {
        std::env::set_var("LLM-concurrency", "0");
        let config = RunConfig::from_env();
        assert_eq!(config.llm_concurrency, 10);
        std::env::remove_var("LLM-concurrency");
    }

    #[test]
    fn run_config_from_env_accepts_valid_concurrency() {
        std::env::set_var("LLM-concurrency", "5");
        let config = RunConfig::from_env();
        assert_eq!(config.llm_concurrency, 5);
        std::env::remove_var("LLM-concurrency");
    }

    #[test]
    fn run_config_from_env_rejects_non_integer_concurrency() {
        std::env::set_var("LLM-concurrency", "not-a-number");
        let config = RunConfig::from_env();
        assert_eq!(config.llm_concurrency, 10);
        std::env::remove_var("LLM-concurrency");
    }
}
