//! Leaked-identifier detection.
//!
//! The upstream occasionally answers with its own account/session token
//! (`user_...`) in place of generated content. Any short text that mentions
//! the prefix is treated as one.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix every leaked identifier starts with.
pub const IDENTIFIER_PREFIX: &str = "user_";

/// Texts shorter than this (in bytes) that mention the prefix are rejected.
const SHORT_TEXT_LIMIT: usize = 40;

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^user_[A-Za-z0-9]{20,}$").expect("static pattern"));

/// Whether `text` looks like a leaked upstream identifier rather than content.
///
/// True if the whole text is `user_` followed by 20+ ASCII alphanumerics, or
/// if it contains `user_` anywhere and is shorter than 40 bytes.
pub fn is_leaked_identifier(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    IDENTIFIER_PATTERN.is_match(text)
        || (text.contains(IDENTIFIER_PREFIX) && text.len() < SHORT_TEXT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_identifier_matches() {
        assert!(is_leaked_identifier("user_abcdefghijklmnopqrstuvwxyz"));
        assert!(is_leaked_identifier("user_2abcDEF0123456789xyzQRSTUVWXYZ0123456789"));
    }

    #[test]
    fn short_text_mentioning_prefix_matches() {
        assert!(is_leaked_identifier("user_123"));
        assert!(is_leaked_identifier("id: user_abc"));
    }

    #[test]
    fn long_text_mentioning_prefix_does_not_match() {
        let text = "This oak table suits every user_friendly kitchen and dining room.";
        assert!(text.len() >= 40);
        assert!(!is_leaked_identifier(text));
    }

    #[test]
    fn text_without_prefix_never_matches() {
        assert!(!is_leaked_identifier(""));
        assert!(!is_leaked_identifier("Great widget"));
        assert!(!is_leaked_identifier("user-abcdefghijklmnopqrstuvwxyz"));
        assert!(!is_leaked_identifier(&"a".repeat(500)));
    }

    #[test]
    fn non_alphanumeric_tail_falls_back_to_length_rule() {
        // 20+ chars but with a dash: pattern fails, length rule decides.
        assert!(is_leaked_identifier("user_abcdefghij-klmnopqrst"));
        let long = format!("user_{}-{}", "a".repeat(20), "b".repeat(20));
        assert!(!is_leaked_identifier(&long));
    }
}
