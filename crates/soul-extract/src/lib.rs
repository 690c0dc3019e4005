//! Soul Extract — recursive memory-root traversal into identity-bearing
//! signals (spec §4.2).

pub mod candidate;
pub mod error;
pub mod extractor;
pub mod origin;
pub mod path_safety;

pub use error::{ExtractError, ExtractResult};
pub use extractor::Extractor;
