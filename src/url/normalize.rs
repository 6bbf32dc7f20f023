//! URL normalization for canonical comparison and link extraction

use url::Url;

/// Normalizes a URL for equality comparison
///
/// Canonical-tag checks must not report a mismatch for differences that are
/// equivalent to browsers: letter case, a trailing slash, or a fragment.
/// The query string is significant and is kept.
///
/// # Arguments
///
/// * `url` - The URL to normalize
///
/// # Returns
///
/// The normalized form: lowercased, trailing slash stripped from the path
/// (the root path becomes empty), fragment removed, query preserved.
///
/// # Example
///
/// ```
/// use crawlplane::url::normalize_for_comparison;
///
/// assert_eq!(
///     normalize_for_comparison("HTTPS://Example.com/Page/"),
///     "https://example.com/page"
/// );
/// ```
pub fn normalize_for_comparison(url: &str) -> String {
    let lowered = url.to_lowercase();
    match Url::parse(&lowered) {
        Ok(parsed) => {
            let host = match parsed.host_str() {
                Some(h) => h,
                // Non-hierarchical URL, fall through to the string fallback
                None => return lowered.trim_end_matches('/').to_string(),
            };
            let path = parsed.path().trim_end_matches('/');
            let mut normalized = format!("{}://{}", parsed.scheme(), host);
            if let Some(port) = parsed.port() {
                normalized.push_str(&format!(":{}", port));
            }
            normalized.push_str(path);
            if let Some(query) = parsed.query() {
                if !query.is_empty() {
                    normalized.push('?');
                    normalized.push_str(query);
                }
            }
            normalized
        }
        Err(_) => lowered.trim_end_matches('/').to_string(),
    }
}

/// Resolves and cleans an href discovered on a page
///
/// Skips hrefs that cannot become crawlable URLs (empty strings, bare
/// fragments, `mailto:` and `tel:` links), resolves relative hrefs against
/// the page URL, and strips the fragment from the result.
///
/// # Arguments
///
/// * `base` - The URL of the page the href was found on
/// * `href` - The raw href attribute value
///
/// # Returns
///
/// * `Some(String)` - An absolute http(s) URL with no fragment
/// * `None` - The href is not a crawlable link
pub fn clean_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.starts_with("mailto:") || href.starts_with("tel:") || href.starts_with("javascript:") {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;

    match resolved.scheme() {
        "http" | "https" => {}
        _ => return None,
    }

    resolved.set_fragment(None);
    Some(resolved.to_string())
}
