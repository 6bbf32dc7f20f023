//! Lossy URL signatures for crawl-trap accounting
//!
//! Calendar pagination, faceted search, and session-id URLs are structurally
//! near-identical but distinct. Generalizing variable path segments into
//! wildcard tokens collapses an unbounded URL family into one counter per
//! structural pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

/// Computes the trap-accounting signature for a URL
///
/// The signature is the URL's host and path with every UUID-shaped path
/// segment replaced by `{uuid}` and every remaining digit run replaced by
/// `{n}`. Query strings are reduced to their sorted parameter names so that
/// `?page=2` and `?page=3` share a signature. Computation is pure and never
/// fails: a URL that cannot be parsed is its own signature.
///
/// # Example
///
/// ```
/// use crawlplane::url::url_signature;
///
/// assert_eq!(
///     url_signature("https://example.com/blog/post-7"),
///     url_signature("https://example.com/blog/post-19"),
/// );
/// ```
pub fn url_signature(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(p) => p,
        Err(_) => return url.to_string(),
    };
    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return url.to_string(),
    };

    let path = parsed
        .path()
        .split('/')
        .map(generalize_segment)
        .collect::<Vec<_>>()
        .join("/");

    let mut signature = format!("{}{}", host, path);

    if let Some(query) = parsed.query() {
        let mut names: Vec<&str> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| p.split('=').next().unwrap_or(p))
            .collect();
        names.sort_unstable();
        names.dedup();
        if !names.is_empty() {
            signature.push('?');
            signature.push_str(&names.join("&"));
        }
    }

    signature
}

fn generalize_segment(segment: &str) -> String {
    if UUID_SEGMENT.is_match(segment) {
        "{uuid}".to_string()
    } else {
        DIGIT_RUN.replace_all(segment, "{n}").into_owned()
    }
}
