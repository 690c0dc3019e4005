//! Soul Classify — the self-healing categorical classifier skeleton
//! shared by every stance/importance/elicitation/provenance/dimension and
//! identity-bearing-filter decision in the pipeline (spec §4.1).

pub mod classifier;
pub mod error;
pub mod sanitize;
pub mod stemmer;

pub use classifier::{self_healing_classify, ClassifyTask};
pub use error::{ClassifyError, ClassifyResult};
