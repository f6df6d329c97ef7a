//! Free-text answer checking.
//!
//! Learners type answers by hand, so grading tolerates case, spacing and
//! stray list commas: `" 1, 2, 3 "` and `"1,2,3"` are the same answer.

/// Canonical form of a free-text answer: lowercased, all whitespace
/// removed (interior included), then leading and trailing commas stripped.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_matches(',').to_string()
}

/// Whether a typed answer matches the expected one after normalization.
///
/// An answer that normalizes to the empty string is never correct, even
/// when the expected value is empty too.
#[must_use]
pub fn is_correct(given: &str, expected: &str) -> bool {
    let given = normalize(given);
    if given.is_empty() {
        return false;
    }
    given == normalize(expected)
}
