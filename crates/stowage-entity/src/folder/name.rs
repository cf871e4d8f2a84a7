//! Name normalization shared by folders and files.

/// Collapse every run of whitespace to a single space and trim the ends.
///
/// Returns an empty string when the input holds only whitespace; callers
/// reject that as a validation error.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_inner_whitespace() {
        assert_eq!(normalize_name("  Quarterly \t  Reports\n"), "Quarterly Reports");
    }

    #[test]
    fn test_blank_becomes_empty() {
        assert_eq!(normalize_name(" \t "), "");
    }

    #[test]
    fn test_already_normal_is_unchanged() {
        assert_eq!(normalize_name("a b.txt"), "a b.txt");
    }
}
