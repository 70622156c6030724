//! The eliminated liar's last-chance word guess

/// Lowercase and keep only letters and digits, so spacing, case and
/// punctuation never decide a guess
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Exact match after normalization. An empty guess never matches.
pub fn is_correct(guess: &str, secret_word: &str) -> bool {
    let guess = normalize(guess);
    !guess.is_empty() && guess == normalize(secret_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_are_ignored() {
        assert!(is_correct("  pizza ", "Pizza"));
        assert!(is_correct("ICE CREAM", "ice cream"));
        assert!(is_correct("icecream", "Ice Cream"));
    }

    #[test]
    fn test_punctuation_is_ignored() {
        assert!(is_correct("t-rex!", "T Rex"));
    }

    #[test]
    fn test_near_misses_are_wrong() {
        assert!(!is_correct("pizzas", "Pizza"));
        assert!(!is_correct("pizz", "Pizza"));
        assert!(!is_correct("", ""));
        assert!(!is_correct("   ", "Pizza"));
    }

    #[test]
    fn test_non_ascii_words() {
        assert!(is_correct("사과", " 사과 "));
        assert!(is_correct("CAFÉ", "café"));
    }
}
