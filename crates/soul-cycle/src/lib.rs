//! Soul Cycle — the run-necessity gate, exclusive lock, and cross-run
//! state persistence wrapped around the reflective loop (spec §4.8).

pub mod lock;
pub mod run_gate;
pub mod state_store;

use soul_core::{PrincipleSummary, Result, RunConfig, RunMetrics, RunResult, SoulState};
use soul_extract::Extractor;
use soul_llm::SoulLlm;
use soul_pipeline::PipelineInput;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// How many freshly extracted signals are sampled for the contradiction
/// check when the corpus hash is unchanged (spec §4.8).
const CONTRADICTION_SAMPLE_SIZE: usize = 5;

pub struct CycleManager<'a> {
    llm: &'a dyn SoulLlm,
    state_dir: PathBuf,
}

impl<'a> CycleManager<'a> {
    pub fn new(llm: &'a dyn SoulLlm, state_dir: impl Into<PathBuf>) -> Self {
        Self { llm, state_dir: state_dir.into() }
    }

    /// Runs one cycle: acquire the lock, sweep orphaned temp files, decide
    /// whether a run is necessary, run the reflective loop if so, persist
    /// the resulting state, and release the lock on every exit path.
    pub async fn run(&self, config: &RunConfig, input: &PipelineInput) -> Result<RunResult> {
        state_store::sweep_orphaned_temp_files(&self.state_dir)?;
        let _guard = lock::acquire(&self.state_dir)?;

        let (prior_state, corrupt) = state_store::read_state(&self.state_dir);
        if corrupt {
            warn!("proceeding from empty state after a corrupt soul state file");
        }

        let current_hash = compute_corpus_hash(&input.memory_root, input.interview_root.as_deref());
        let hash_changed = current_hash != prior_state.content_hash;

        let contradiction_found = if config.force_resynthesis || hash_changed {
            false
        } else {
            self.sample_contradiction(config, input, &prior_state).await
        };

        if !run_gate::should_run(config.force_resynthesis, hash_changed, contradiction_found) {
            info!("no material change and no contradiction sample found, skipping this cycle");
            return Ok(RunResult {
                signals: Vec::new(),
                principles: Vec::new(),
                axioms: prior_state.prior_axioms,
                metrics: RunMetrics::default(),
                skipped: true,
            });
        }

        let result = soul_pipeline::run(self.llm, config, input).await;

        let new_state = SoulState {
            format_version: SoulState::CURRENT_FORMAT_VERSION,
            prior_axioms: result.axioms.clone(),
            prior_principles_summary: result
                .principles
                .iter()
                .map(|p| PrincipleSummary {
                    id: p.id,
                    text: p.text.clone(),
                    dimension: p.dimension,
                    n_count: p.n_count,
                })
                .collect(),
            content_hash: current_hash,
            last_run_at: Some(chrono::Utc::now()),
        };
        state_store::write_state(&self.state_dir, &new_state)?;

        Ok(result)
    }

    /// Draws a small fresh-signal sample purely to feed the contradiction
    /// gate; this is intentionally cheaper than the full extraction the
    /// reflective loop performs once a run is already decided necessary.
    async fn sample_contradiction(&self, config: &RunConfig, input: &PipelineInput, prior_state: &SoulState) -> bool {
        if prior_state.prior_axioms.is_empty() {
            return false;
        }

        let extractor = Extractor::new(self.llm, config.llm_concurrency);
        let signals = match extractor.extract(&input.memory_root).await {
            Ok(signals) => signals,
            Err(err) => {
                warn!(error = %err, "contradiction sample extraction failed, skipping sample check");
                return false;
            }
        };

        let sample: Vec<_> = signals.into_iter().take(CONTRADICTION_SAMPLE_SIZE).collect();
        if sample.is_empty() {
            return false;
        }

        run_gate::detect_contradiction(self.llm, &prior_state.prior_axioms, &sample).await
    }
}

/// SHA-256 over the sorted, concatenated contents of every file under the
/// memory root (and interview root, if present). Symlinks are never
/// followed, matching the extractor's own traversal rule.
fn compute_corpus_hash(memory_root: &Path, interview_root: Option<&Path>) -> String {
    let mut contents = String::new();
    for root in std::iter::once(memory_root).chain(interview_root) {
        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .collect();
        paths.sort();
        for path in paths {
            if let Ok(text) = std::fs::read_to_string(&path) {
                contents.push_str(&text);
                contents.push('\n');
            }
        }
    }
    soul_core::hash::sha256_hex(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::MockSoulLlm;
    use std::io::Write;

    #[tokio::test]
    async fn first_run_with_no_prior_state_always_runs() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
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

        let manager = CycleManager::new(&llm, &state_dir);
        let config = RunConfig::default();
        let input = PipelineInput { memory_root, interview_root: None, model_id: "test-model".to_string() };

        let result = manager.run(&config, &input).await.unwrap();
        assert!(!result.skipped);
        assert!(state_dir.join("soul-state.json").exists());
    }

    #[tokio::test]
    async fn unchanged_corpus_with_no_prior_axioms_skips_the_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
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

        let manager = CycleManager::new(&llm, &state_dir);
        let config = RunConfig::default();
        let input = PipelineInput { memory_root: memory_root.clone(), interview_root: None, model_id: "test-model".to_string() };

        let first = manager.run(&config, &input).await.unwrap();
        assert!(!first.skipped);

        let second = manager.run(&config, &input).await.unwrap();
        assert!(second.skipped);
    }

    #[tokio::test]
    async fn force_resynthesis_reruns_even_with_an_unchanged_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let memory_root = dir.path().join("memory");
        std::fs::create_dir_all(&memory_root).unwrap();
        let mut file = std::fs::File::create(memory_root.join("diary.md")).unwrap();
        writeln!(file, "- I tell the truth when it costs me.").unwrap();

        let llm = MockSoulLlm::new();
        for _ in 0..2 {
            llm.push_generate(Ok("yes".to_string()));
            for _ in 0..15 {
                llm.push_generate(Ok("completely unrelated gibberish".to_string()));
            }
            llm.push_generate(Ok("Values honesty over comfort.".to_string()));
        }

        let manager = CycleManager::new(&llm, &state_dir);
        let mut config = RunConfig::default();
        let input = PipelineInput { memory_root: memory_root.clone(), interview_root: None, model_id: "test-model".to_string() };

        let first = manager.run(&config, &input).await.unwrap();
        assert!(!first.skipped);

        config.force_resynthesis = true;
        let second = manager.run(&config, &input).await.unwrap();
        assert!(!second.skipped);
    }
}
