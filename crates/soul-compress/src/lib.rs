//! Soul Compress — promotion cascade from principles to axioms, gated by
//! the anti-echo-chamber grounding predicate (spec §4.5).

pub mod compressor;

pub use compressor::{compress, grounding_predicate, CompressionResult};
