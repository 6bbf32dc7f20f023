//! Typed page records delivered by the fetcher collaborator
//!
//! The core never parses raw markup. The fetcher extracts everything the
//! analyzer and frontier need into a [`PageRecord`] and hands it over, one
//! record per crawled URL. Absent fields are `None`/empty rather than
//! sentinel strings, validated here at the boundary instead of re-checked
//! inside every rule.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One heading element, in document order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level, 1 through 6
    pub level: u8,
    pub text: String,
}

/// One image element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    /// `None` when the alt attribute is absent; an empty string counts as
    /// missing alt text for audit purposes
    #[serde(default)]
    pub alt: Option<String>,
    /// Both width and height attributes present
    #[serde(default)]
    pub has_dimensions: bool,
}

/// An element on the path from an anchor up to the document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncestorElement {
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
}

/// One outbound anchor found on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundLink {
    pub href: String,
    #[serde(default)]
    pub anchor_text: String,
    #[serde(default)]
    pub is_nofollow: bool,
    /// target="_blank"
    #[serde(default)]
    pub opens_new_tab: bool,
    /// rel contains noopener or noreferrer
    #[serde(default)]
    pub has_noopener: bool,
    /// Ancestor chain from the anchor outward, for placement classification
    #[serde(default)]
    pub ancestors: Vec<AncestorElement>,
}

/// One hop in the redirect chain that led to the final URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectHop {
    pub url: String,
    pub status_code: u16,
}

/// One JSON-LD / microdata block extracted from the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredDataBlock {
    /// The @type value, e.g. "FAQPage" or "Article"
    pub schema_type: String,
    /// Number of Question entities, for FAQPage blocks
    #[serde(default)]
    pub question_count: usize,
    #[serde(default)]
    pub has_headline: bool,
    #[serde(default)]
    pub has_date_published: bool,
}

/// A fully extracted page, as delivered by the fetcher
///
/// Identity is the URL string. Status code 0 means the connection itself
/// failed and no other field is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub status_code: u16,

    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    /// Every hop the fetcher followed before the final response
    #[serde(default)]
    pub redirect_chain: Vec<RedirectHop>,

    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub headings: Vec<Heading>,
    #[serde(default)]
    pub word_count: u32,

    #[serde(default)]
    pub canonical_url: Option<String>,
    /// Robots meta directive: noindex present
    #[serde(default)]
    pub noindex: bool,
    /// Robots meta directive: nofollow present
    #[serde(default)]
    pub nofollow: bool,

    /// html lang attribute
    #[serde(default)]
    pub lang: Option<String>,
    /// Viewport meta tag content
    #[serde(default)]
    pub viewport: Option<String>,

    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// Stylesheet and script URLs, for mixed-content checks
    #[serde(default)]
    pub resource_urls: Vec<String>,
    #[serde(default)]
    pub links: Vec<OutboundLink>,

    /// Open Graph property names found on the page
    #[serde(default)]
    pub og_tags: Vec<String>,
    /// Twitter card property names found on the page
    #[serde(default)]
    pub twitter_tags: Vec<String>,

    #[serde(default)]
    pub structured_data: Vec<StructuredDataBlock>,

    /// Response headers, names lowercased by the fetcher
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl PageRecord {
    /// Minimal record for a URL that could not be connected to
    pub fn connection_failed(url: impl Into<String>) -> Self {
        PageRecord {
            url: url.into(),
            status_code: 0,
            response_time_ms: None,
            size_bytes: None,
            redirect_chain: Vec::new(),
            title: None,
            meta_description: None,
            headings: Vec::new(),
            word_count: 0,
            canonical_url: None,
            noindex: false,
            nofollow: false,
            lang: None,
            viewport: None,
            images: Vec::new(),
            resource_urls: Vec::new(),
            links: Vec::new(),
            og_tags: Vec::new(),
            twitter_tags: Vec::new(),
            structured_data: Vec::new(),
            headers: HashMap::new(),
        }
    }

    /// Case-insensitive response-header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.headers.get(&lower).map(|v| v.as_str())
    }

    /// Text of every H1 on the page
    pub fn h1_texts(&self) -> Vec<&str> {
        self.headings
            .iter()
            .filter(|h| h.level == 1)
            .map(|h| h.text.as_str())
            .collect()
    }

    /// First H1 text, if any
    pub fn first_h1(&self) -> Option<&str> {
        self.h1_texts().first().copied()
    }
}
