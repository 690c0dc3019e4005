//! Soul Core — data model, error types, and content hashing
//!
//! Shared by every crate in the synthesis pipeline. No LLM calls, no I/O
//! beyond the content-hash helper; pure types and the invariants that
//! apply to them.

pub mod error;
pub mod hash;
pub mod types;

pub use error::{Result, SynthesisError};
pub use types::*;
