/// Checks if a URL matches a reject pattern
///
/// Patterns are matched against the whole URL. `*` matches any run of
/// characters (including none); every other character matches itself.
///
/// # Examples
///
/// ```
/// use roundabout::url::matches_glob;
///
/// assert!(matches_glob("*/logout*", "https://example.com/logout?next=/"));
/// assert!(matches_glob("*.zip", "https://example.com/files/archive.zip"));
/// assert!(!matches_glob("*.zip", "https://example.com/files/archive.zip.html"));
/// assert!(matches_glob("https://example.com/admin", "https://example.com/admin"));
/// ```
pub fn matches_glob(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.as_bytes();
    let candidate = candidate.as_bytes();

    let (mut p, mut c) = (0, 0);
    // Position of the last '*' seen, and the candidate index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, c));
            p += 1;
        } else if p < pattern.len() && pattern[p] == candidate[c] {
            p += 1;
            c += 1;
        } else if let Some((star, tried)) = backtrack {
            p = star + 1;
            c = tried + 1;
            backtrack = Some((star, tried + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&b| b == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_glob("https://a.com/x", "https://a.com/x"));
        assert!(!matches_glob("https://a.com/x", "https://a.com/xy"));
        assert!(!matches_glob("https://a.com/xy", "https://a.com/x"));
    }

    #[test]
    fn test_leading_wildcard() {
        assert!(matches_glob("*.pdf", "https://a.com/doc.pdf"));
        assert!(!matches_glob("*.pdf", "https://a.com/doc.pdf?download=1"));
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(matches_glob("https://a.com/admin*", "https://a.com/admin"));
        assert!(matches_glob("https://a.com/admin*", "https://a.com/admin/users"));
        assert!(!matches_glob("https://a.com/admin*", "https://a.com/about"));
    }

    #[test]
    fn test_inner_wildcards() {
        assert!(matches_glob("*/users/*/delete", "https://a.com/users/42/delete"));
        assert!(!matches_glob("*/users/*/delete", "https://a.com/users/42/edit"));
    }

    #[test]
    fn test_backtracking() {
        assert!(matches_glob("*ab*ab", "xxabyyabab"));
        assert!(matches_glob("a*b*c", "abbbc"));
        assert!(!matches_glob("a*b*c", "abbbd"));
    }

    #[test]
    fn test_empty_candidate() {
        assert!(matches_glob("*", ""));
        assert!(!matches_glob("a*", ""));
    }
}
