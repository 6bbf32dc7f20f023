//! URL-based page-type classification
//!
//! The same absence (no title, no canonical, a noindex directive) is a
//! critical defect on a content page but expected on an archive or utility
//! page, so rule severity is modulated by this classification.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Heuristic bucketing of a URL for severity determination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Taxonomy/date/pagination/search pages where thin metadata is normal
    Archive,
    /// Homepage, service/location/contact pages, and content posts
    Important,
    Other,
}

/// Substring patterns that mark taxonomy, pagination, and feed paths
const ARCHIVE_PATH_PATTERNS: &[&str] = &[
    "/author/",
    "/tag/",
    "/category/",
    "/tags/",
    "/categories/",
    "/page/",
    "/feed/",
    "/search/",
    "/attachment/",
    "/archive/",
    "/archives/",
];

/// Substring patterns for homepage-adjacent pages that must be indexable
const IMPORTANT_PATH_PATTERNS: &[&str] = &[
    "/service",
    "/services",
    "/location",
    "/locations",
    "-dentist",
    "/contact",
    "/about",
];

/// Utility paths that get an extra severity downgrade for missing metadata
const UTILITY_PATH_PATTERNS: &[&str] = &[
    "/thank-you",
    "/thankyou",
    "/confirmation",
    "/privacy-policy",
    "/privacy",
    "/terms",
    "/legal",
    "/cookie-policy",
    "/gdpr",
    "/dmca",
    "/login",
    "/register",
    "/signup",
    "/account",
    "/cart",
    "/checkout",
    "/wishlist",
    "/search",
    "/404",
    "/error",
];

/// Year/month/day archive paths like /2024/ or /2024/01/15/
static DATE_ARCHIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d{4}/(\d{2}/)?(\d{2}/)?$").unwrap());

/// Dated blog posts have a slug after the date path
static DATED_POST: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{4}/\d{2}/\d{2}/[a-z0-9-]+").unwrap());

/// Classifies a URL as archive, important, or other
pub fn classify(url: &str) -> PageType {
    if url.is_empty() {
        return PageType::Other;
    }
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => return PageType::Other,
    };

    for pattern in ARCHIVE_PATH_PATTERNS {
        if path.contains(pattern) || url.contains(pattern) {
            return PageType::Archive;
        }
    }
    if url.contains("/?s=") || DATE_ARCHIVE.is_match(&path) {
        return PageType::Archive;
    }
    if url.contains("page=") || url.contains("paged=") {
        return PageType::Archive;
    }

    if path.is_empty() || path == "/" {
        return PageType::Important;
    }
    for pattern in IMPORTANT_PATH_PATTERNS {
        if path.contains(pattern) {
            return PageType::Important;
        }
    }
    if DATED_POST.is_match(&path) {
        return PageType::Important;
    }

    // Single-slug paths are likely standalone content pages
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() == 1 && segments[0].len() > 3 {
        return PageType::Important;
    }

    PageType::Other
}

/// Reports whether a URL sits on a utility path (login, cart, legal, ...)
pub fn is_utility(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => return false,
    };
    UTILITY_PATH_PATTERNS.iter().any(|p| path.contains(p))
}
