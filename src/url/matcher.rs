//! Exclusion-pattern matching on URL paths

use url::Url;

/// A compiled list of path-exclusion patterns
///
/// Patterns containing `*` are matched as globs against the URL path
/// (`*` spans any run of characters, including `/`). Patterns without `*`
/// match the path exactly or as a prefix.
#[derive(Debug, Clone, Default)]
pub struct ExclusionMatcher {
    patterns: Vec<String>,
}

impl ExclusionMatcher {
    /// Creates a matcher from a list of path patterns
    pub fn new(patterns: Vec<String>) -> Self {
        ExclusionMatcher { patterns }
    }

    /// Reports whether a URL's path matches any exclusion pattern
    ///
    /// # Example
    ///
    /// ```
    /// use crawlplane::url::ExclusionMatcher;
    ///
    /// let matcher = ExclusionMatcher::new(vec!["/wp-admin/*".to_string()]);
    /// assert!(matcher.is_excluded("https://example.com/wp-admin/edit.php"));
    /// assert!(!matcher.is_excluded("https://example.com/blog/"));
    /// ```
    pub fn is_excluded(&self, url: &str) -> bool {
        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.to_string(),
        };
        self.patterns.iter().any(|p| matches_pattern(p, &path))
    }

    /// Reports whether the matcher has no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Checks a single path against a single pattern
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    if pattern.contains('*') {
        glob_match(pattern, path)
    } else {
        path == pattern || path.starts_with(pattern)
    }
}

/// `*`-only glob matching, iterative with single-star backtracking
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            // Grow the most recent star's span by one and retry
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
