//! Display name rules

/// Minimum username length
pub const MIN_LEN: usize = 3;
/// Maximum username length
pub const MAX_LEN: usize = 20;

/// Check the username format
///
/// True iff the name is 3 to 20 characters long and consists only of ASCII
/// letters, digits and underscores.
pub fn validate(name: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate("valid_name1"));
        assert!(validate("abc"));
        assert!(validate("A_1"));
        assert!(validate(&"x".repeat(MAX_LEN)));
    }

    #[test]
    fn test_too_short() {
        assert!(!validate("ab"));
        assert!(!validate(""));
    }

    #[test]
    fn test_too_long() {
        assert!(!validate(&"x".repeat(MAX_LEN + 1)));
    }

    #[test]
    fn test_disallowed_characters() {
        assert!(!validate("name-with-dash"));
        assert!(!validate("with space"));
        assert!(!validate("émile"));
        assert!(!validate("bob!"));
    }
}
