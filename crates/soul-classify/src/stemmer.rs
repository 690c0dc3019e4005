//! Light stemmer for normalized category matching (spec §4.1, §9).
//!
//! No stemming crate is attested anywhere in the retrieved example corpus,
//! so this is hand-written rather than borrowed from the teacher — the one
//! deliberate exception to "never hand-roll what the ecosystem provides"
//! (nothing in the corpus provides it). Hyphens are normalized to spaces
//! *before* stemming, per spec §9's design note (the source stemmed
//! hyphenated category names without first normalizing the hyphen, which
//! produced spurious mismatches).

const SUFFIXES: &[&str] = &[
    "ational", "ization", "fulness", "ousness", "iveness", "tional", "ically", "ation", "ement",
    "ness", "ity", "ful", "ing", "ance", "ence", "able", "ible", "tion", "less", "ment", "ly", "ed",
    "es", "s",
];

/// Strips the longest matching suffix, leaving at least 3 characters —
/// short enough to avoid over-stemming category tokens like "self".
fn stem_word(word: &str) -> String {
    for suffix in SUFFIXES {
        if let Some(stripped) = word.strip_suffix(suffix) {
            if stripped.chars().count() >= 3 {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

/// Lowercases, normalizes hyphens/underscores to spaces, strips remaining
/// punctuation, and stems each word — the normalized form used for
/// category-match comparison.
pub fn normalize_for_match(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = lowered.replace(['-', '_'], " ");
    let words: Vec<String> = spaced
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(stem_word)
        .collect();
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_category_matches_spaced_response() {
        assert_eq!(
            normalize_for_match("identity-core"),
            normalize_for_match("identity core")
        );
    }

    #[test]
    fn stemming_collapses_simple_inflections() {
        assert_eq!(normalize_for_match("values"), normalize_for_match("value"));
        assert_eq!(normalize_for_match("asserting"), normalize_for_match("assert"));
    }

    #[test]
    fn short_words_are_not_over_stemmed() {
        assert_eq!(normalize_for_match("self"), "self");
    }
}
