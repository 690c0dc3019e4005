//! The self-healing classifier skeleton (spec §4.1). Every categorical
//! classification in this workspace — stance, importance, elicitation,
//! provenance, dimension, and the identity-bearing yes/no filter — shares
//! this one implementation; callers only vary the prompt text and category
//! set.

use crate::error::ClassifyResult;
use crate::sanitize::{delimit, sanitize};
use crate::stemmer::normalize_for_match;
use soul_llm::SoulLlm;

/// Total classifier attempts before giving up and returning `None`. A
/// persistent LLM-call failure (post-backoff) surfaces as an error
/// immediately and does not consume an attempt.
const MAX_ATTEMPTS: usize = 3;

/// LLM-call retry ceiling for transient failures within a single attempt.
const BACKOFF_ATTEMPTS: usize = 3;

/// Bound on the untrusted input embedded in a classifier prompt.
const MAX_INPUT_CHARS: usize = 4_000;

/// How many response words before a candidate category count as its
/// negation window (spec §4.1: "a small left-hand window").
const NEGATION_WINDOW: usize = 3;

/// One categorical classification task: the instruction the LLM sees and
/// the legal category set it must choose from.
pub struct ClassifyTask<'a> {
    pub instruction: &'a str,
    pub categories: &'a [&'a str],
    pub input: &'a str,
}

/// Runs the self-healing classify skeleton: sanitize + delimit the input,
/// list every legal category verbatim, parse with the exact → normalized →
/// negation-aware-substring cascade, and on an unresolved response retry
/// with the previous malformed output attached and a corrective directive
/// — up to [`MAX_ATTEMPTS`] times. Returns `None`, never a default
/// category, if every attempt is exhausted (spec §9: defaulting to the
/// first category is a measured bias source).
pub async fn self_healing_classify(
    llm: &dyn SoulLlm,
    task: ClassifyTask<'_>,
) -> ClassifyResult<Option<String>> {
    let sanitized_input = sanitize(task.input, MAX_INPUT_CHARS);
    let delimited = delimit(&sanitized_input);
    let category_list = task.categories.join(", ");

    let mut previous_malformed: Option<String> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        let system = format!(
            "{instruction}\nLegal categories: {category_list}\nRespond with exactly one category token verbatim from that list, nothing else.",
            instruction = task.instruction,
        );

        let user = match &previous_malformed {
            None => delimited.clone(),
            Some(prior) => format!(
                "{delimited}\n\nYour previous response could not be resolved to any legal category: \"{prior}\"\nRespond again with exactly one category token verbatim from the list above, nothing else."
            ),
        };

        let response =
            soul_llm::retry::with_backoff(BACKOFF_ATTEMPTS, || llm.generate(&system, &user)).await?;

        match resolve_category(&response, task.categories) {
            Some(category) => return Ok(Some(category)),
            None => {
                tracing::debug!(attempt, response = %response, "classifier attempt unresolved");
                previous_malformed = Some(response);
            }
        }
    }

    Ok(None)
}

/// Exact match, then normalized (hyphen-folded, stemmed) match, then a
/// negation-aware substring test — in that order (spec §4.1).
fn resolve_category(response: &str, categories: &[&str]) -> Option<String> {
    let trimmed = response.trim();
    for category in categories {
        if trimmed == *category {
            return Some((*category).to_string());
        }
    }

    let normalized_response = normalize_for_match(response);
    for category in categories {
        if normalize_for_match(category) == normalized_response {
            return Some((*category).to_string());
        }
    }

    let response_words: Vec<&str> = normalized_response.split_whitespace().collect();
    for category in categories {
        let normalized_category = normalize_for_match(category);
        let candidate_words: Vec<&str> = normalized_category.split_whitespace().collect();
        if let Some(start) = find_subsequence(&response_words, &candidate_words) {
            if !negated_before(&response_words, start, NEGATION_WINDOW) {
                return Some((*category).to_string());
            }
        }
    }

    None
}

fn find_subsequence(haystack: &[&str], needle: &[&str]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=(haystack.len() - needle.len())).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn negated_before(words: &[&str], start: usize, window: usize) -> bool {
    let from = start.saturating_sub(window);
    words[from..start].iter().any(|w| *w == "not" || *w == "no")
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::provider::LlmError;
    use soul_llm::MockSoulLlm;

    const CATEGORIES: &[&str] = &["assert", "deny", "question", "qualify", "tensioning"];

    #[tokio::test]
    async fn resolves_on_exact_verbatim_response() {
        let llm = MockSoulLlm::new();
        llm.push_generate(Ok("assert".to_string()));
        let result = self_healing_classify(
            &llm,
            ClassifyTask {
                instruction: "Classify the stance of this statement.",
                categories: CATEGORIES,
                input: "I always tell the truth.",
            },
        )
        .await
        .unwrap();
        assert_eq!(result, Some("assert".to_string()));
    }

    #[tokio::test]
    async fn resolves_via_stemmed_normalization() {
        let llm = MockSoulLlm::new();
        llm.push_generate(Ok("Asserting.".to_string()));
        let result = self_healing_classify(
            &llm,
            ClassifyTask {
                instruction: "Classify the stance of this statement.",
                categories: CATEGORIES,
                input: "I always tell the truth.",
            },
        )
        .await
        .unwrap();
        assert_eq!(result, Some("assert".to_string()));
    }

    #[tokio::test]
    async fn rejects_negated_substring_match() {
        let llm = MockSoulLlm::new();
        llm.push_generate(Ok("This is not an assert, it reads as a qualify.".to_string()));
        let result = self_healing_classify(
            &llm,
            ClassifyTask {
                instruction: "Classify the stance of this statement.",
                categories: CATEGORIES,
                input: "I might tell the truth.",
            },
        )
        .await
        .unwrap();
        assert_eq!(result, Some("qualify".to_string()));
    }

    #[tokio::test]
    async fn retries_with_corrective_directive_then_resolves() {
        let llm = MockSoulLlm::new();
        llm.push_generate(Ok("I'm not sure, maybe something else entirely".to_string()));
        llm.push_generate(Ok("deny".to_string()));
        let result = self_healing_classify(
            &llm,
            ClassifyTask {
                instruction: "Classify the stance of this statement.",
                categories: CATEGORIES,
                input: "I never lie.",
            },
        )
        .await
        .unwrap();
        assert_eq!(result, Some("deny".to_string()));
    }

    #[tokio::test]
    async fn returns_none_after_exhausting_attempts() {
        let llm = MockSoulLlm::new();
        for _ in 0..MAX_ATTEMPTS {
            llm.push_generate(Ok("completely unrelated gibberish".to_string()));
        }
        let result = self_healing_classify(
            &llm,
            ClassifyTask {
                instruction: "Classify the stance of this statement.",
                categories: CATEGORIES,
                input: "I never lie.",
            },
        )
        .await
        .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn persistent_llm_failure_surfaces_as_error() {
        let llm = MockSoulLlm::new();
        for _ in 0..BACKOFF_ATTEMPTS {
            llm.push_generate(Err(LlmError::RequestFailed("down".to_string())));
        }
        let result = self_healing_classify(
            &llm,
            ClassifyTask {
                instruction: "Classify the stance of this statement.",
                categories: CATEGORIES,
                input: "I never lie.",
            },
        )
        .await;
        assert!(result.is_err());
    }
}
