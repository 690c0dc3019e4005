//! Validation predicate for a generalized paraphrase (spec §4.3): rejects
//! first-/second-person pronouns, empty output, and output beyond the
//! length cap.

use regex::Regex;
use std::sync::OnceLock;

pub const MAX_GENERALIZED_LEN: usize = 280;

const FORBIDDEN_PRONOUNS: &[&str] = &[
    "i", "me", "my", "mine", "myself", "you", "your", "yours", "yourself", "we", "us", "our",
    "ours",
];

fn pronoun_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternation = FORBIDDEN_PRONOUNS.join("|");
        Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("static regex")
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationFailure {
    Empty,
    TooLong,
    ContainsPronoun,
}

pub fn validate_generalization(text: &str) -> Result<(), ValidationFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::Empty);
    }
    if trimmed.chars().count() > MAX_GENERALIZED_LEN {
        return Err(ValidationFailure::TooLong);
    }
    if pronoun_pattern().is_match(trimmed) {
        return Err(ValidationFailure::ContainsPronoun);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_actor_agnostic_paraphrase() {
        assert!(validate_generalization("Values honesty over social comfort.").is_ok());
    }

    #[test]
    fn rejects_first_person_pronoun() {
        assert_eq!(
            validate_generalization("I value honesty over comfort."),
            Err(ValidationFailure::ContainsPronoun)
        );
    }

    #[test]
    fn rejects_second_person_pronoun() {
        assert_eq!(
            validate_generalization("Your honesty matters most."),
            Err(ValidationFailure::ContainsPronoun)
        );
    }

    #[test]
    fn rejects_empty_output() {
        assert_eq!(validate_generalization("   "), Err(ValidationFailure::Empty));
    }

    #[test]
    fn rejects_over_length_cap() {
        let long = "a".repeat(MAX_GENERALIZED_LEN + 1);
        assert_eq!(validate_generalization(&long), Err(ValidationFailure::TooLong));
    }

    #[test]
    fn does_not_false_positive_on_substring_of_pronoun() {
        // "mine" and "us" both appear as substrings of ordinary words; the
        // word-boundary match must not trigger on those.
        assert!(validate_generalization("Determination shapes every decision.").is_ok());
    }
}
