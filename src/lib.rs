//! Soul Synthesis — a library facade over the synthesis core workspace.
//!
//! This crate carries no binary and never touches argument parsing,
//! process exit codes, or subscriber initialization: those are explicit
//! Non-goals (spec.md §1). The embedding application constructs a
//! [`RunConfig`], installs its own `tracing` subscriber, and drives one or
//! more cycles through [`run`].

pub use soul_core::{
    ArtifactCategory, Axiom, AxiomDerivation, CascadeLevel, Centrality, DerivedSignalRef, Dimension, Elicitation,
    EntityId, GeneralizedSignal, Importance, Principle, PrincipleSummary, Provenance, Result, RunConfig, RunMetrics,
    RunResult, Severity, Signal, SignalId, SignalSource, SoulState, Stance, SynthesisError, Tension,
};
pub use soul_cycle::CycleManager;
pub use soul_llm::{LlmError, RawLlmProvider, SoulLlm};
pub use soul_pipeline::PipelineInput;

use std::path::PathBuf;

/// Runs one synthesis cycle against a state directory, honoring the
/// run-necessity gate, lock, and state persistence described in spec.md
/// §4.8. This is the one entry point the facade exposes.
pub async fn run(llm: &dyn SoulLlm, config: &RunConfig, input: &PipelineInput, state_dir: impl Into<PathBuf>) -> Result<RunResult> {
    let manager = CycleManager::new(llm, state_dir);
    manager.run(config, input).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::MockSoulLlm;
    use std::io::Write;

    #[tokio::test]
    async fn run_produces_a_result_against_a_fresh_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let memory_root = dir.path().join("memory");
        std::fs::create_dir_all(&memory_root).unwrap();
        let mut file = std::fs::File::create(memory_root.join("diary.md")).unwrap();
        writeln!(file, "- I tell the truth when it costs me.").unwrap();

        let llm = MockSoulLlm::new();
        llm.push_generate(Ok("yes".to_string()));
        for _ in 0..15 {
            llm.push_generate(Ok("completely unrelated gibberish".to_string()));
        }
        llm.push_generate(Ok("Values honesty over comfort.".to_string()));

        let config = RunConfig::default();
        let input = PipelineInput { memory_root, interview_root: None, model_id: "test-model".to_string() };
        let state_dir = dir.path().join("state");

        let result = run(&llm, &config, &input, &state_dir).await.unwrap();
        assert!(!result.skipped);
    }
}
