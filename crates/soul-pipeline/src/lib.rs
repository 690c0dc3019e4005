//! Soul Pipeline — the reflective loop orchestrating extraction through
//! tension detection in one fixed, non-iterative pass (spec §4.7).

pub mod reflective_loop;

pub use reflective_loop::{run, PipelineInput};
