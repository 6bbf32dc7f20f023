//! URL handling: normalization, signatures, exclusion matching, and scope

pub mod matcher;
pub mod normalize;
pub mod signature;

pub use matcher::ExclusionMatcher;
pub use normalize::{clean_href, normalize_for_comparison};
pub use signature::url_signature;

use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Where a link target sits relative to the crawl's base domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkScope {
    /// Same registrable host as the base domain
    Root,
    /// A subdomain of the base domain
    Sub,
    /// A different domain entirely
    External,
}

impl LinkScope {
    /// Converts the scope to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            LinkScope::Root => "root",
            LinkScope::Sub => "sub",
            LinkScope::External => "external",
        }
    }

    /// Parses a scope from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "root" => Some(LinkScope::Root),
            "sub" => Some(LinkScope::Sub),
            "external" => Some(LinkScope::External),
            _ => None,
        }
    }
}

/// Extracts the host from a URL string
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Ok(String)` - The lowercased host
/// * `Err(UrlError)` - The URL could not be parsed or has no host
pub fn extract_domain(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|_| UrlError::Parse(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }
    parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)
}

/// Strips a leading `www.` from a host, for internal-link comparison
fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Reports whether two URLs point at the same site, ignoring `www.`
pub fn is_internal(url: &str, base_domain: &str) -> bool {
    match extract_domain(url) {
        Ok(host) => strip_www(&host) == strip_www(base_domain),
        Err(_) => false,
    }
}

/// Classifies a link target's scope relative to the crawl's base domain
pub fn classify_scope(url: &str, base_domain: &str) -> LinkScope {
    let host = match extract_domain(url) {
        Ok(h) => h,
        Err(_) => return LinkScope::External,
    };
    let base = strip_www(base_domain);
    let host_bare = strip_www(&host);
    if host_bare == base {
        LinkScope::Root
    } else if host_bare.ends_with(&format!(".{}", base)) {
        LinkScope::Sub
    } else {
        LinkScope::External
    }
}
