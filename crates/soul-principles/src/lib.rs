//! Soul Principles — single-pass clustering store mapping generalized
//! signals onto a growing set of principles (spec §4.4).

pub mod store;

pub use store::{IngestOutcome, PrincipleStore};
