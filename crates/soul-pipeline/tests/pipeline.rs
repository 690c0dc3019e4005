use soul_core::RunConfig;
use soul_llm::MockSoulLlm;
use soul_pipeline::{run, PipelineInput};
use std::io::Write;

/// End-to-end smoke test (spec §4.7): a single ungrounded signal survives
/// extraction, generalization, and clustering, but is never promoted to an
/// axiom because nothing in its evidence clears the grounding predicate.
#[tokio::test]
async fn single_self_authored_signal_never_produces_an_axiom() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("diary.md")).unwrap();
    writeln!(file, "- I tell the truth when it costs me.").unwrap();

    let llm = MockSoulLlm::new();
    // identity-bearing filter resolves immediately.
    llm.push_generate(Ok("yes".to_string()));
    // every metadata classifier (stance, importance, elicitation,
    // provenance, dimension) exhausts all 3 attempts on unresolvable text,
    // landing on its documented default — every default here is
    // self-authored / non-question, so the grounding predicate must fail.
    for _ in 0..15 {
        llm.push_generate(Ok("completely unrelated gibberish".to_string()));
    }
    // generalization call.
    llm.push_generate(Ok("Values honesty over comfort.".to_string()));

    let config = RunConfig::default();
    let input = PipelineInput {
        memory_root: dir.path().to_path_buf(),
        interview_root: None,
        model_id: "test-model".to_string(),
    };

    let result = run(&llm, &config, &input).await;

    assert_eq!(result.signals.len(), 1);
    assert_eq!(result.principles.len(), 1);
    assert!(result.axioms.is_empty());
    assert_eq!(result.metrics.signal_count, 1);
    assert_eq!(result.metrics.cascade_level.as_deref(), Some("n>=1"));
    assert!(!result.skipped);
}

#[tokio::test]
async fn empty_memory_root_returns_an_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let llm = MockSoulLlm::new();
    let config = RunConfig::default();
    let input = PipelineInput {
        memory_root: dir.path().to_path_buf(),
        interview_root: None,
        model_id: "test-model".to_string(),
    };

    let result = run(&llm, &config, &input).await;

    assert!(result.signals.is_empty());
    assert!(result.principles.is_empty());
    assert!(result.axioms.is_empty());
    assert!(!result.skipped);
}
