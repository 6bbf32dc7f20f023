//! The audit link graph
//!
//! Every observed anchor becomes a [`LinkEdge`] for reporting, independent of
//! the enqueue decision. This path never applies trap filtering and never
//! blocks the traversal hot path.

use crate::record::{AncestorElement, PageRecord};
use crate::url::{classify_scope, clean_href, is_internal, LinkScope};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const MAX_ANCHOR_TEXT: usize = 100;

/// Where on the page a link appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPlacement {
    Navigation,
    Footer,
    Body,
}

impl LinkPlacement {
    /// Converts the placement to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            LinkPlacement::Navigation => "navigation",
            LinkPlacement::Footer => "footer",
            LinkPlacement::Body => "body",
        }
    }

    /// Parses a placement from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "navigation" => Some(LinkPlacement::Navigation),
            "footer" => Some(LinkPlacement::Footer),
            "body" => Some(LinkPlacement::Body),
            _ => None,
        }
    }
}

/// One deduplicated source→target anchor observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub source_url: String,
    pub target_url: String,
    pub anchor_text: String,
    pub is_internal: bool,
    pub is_nofollow: bool,
    pub scope: LinkScope,
    pub placement: LinkPlacement,
    /// Backfilled once the target has been crawled
    pub target_status: Option<u16>,
}

/// Classifies a link's placement by walking its ancestor elements
///
/// A footer ancestor wins over a navigation ancestor; anything else is body.
pub fn classify_placement(ancestors: &[AncestorElement]) -> LinkPlacement {
    let mut placement = LinkPlacement::Body;
    for ancestor in ancestors {
        let tag = ancestor.tag.to_lowercase();
        let classes: Vec<String> = ancestor.classes.iter().map(|c| c.to_lowercase()).collect();

        if tag == "footer" || classes.iter().any(|c| c.contains("footer")) {
            return LinkPlacement::Footer;
        }
        if tag == "nav"
            || tag == "header"
            || classes
                .iter()
                .any(|c| c.contains("nav") || c.contains("menu") || c.contains("header"))
        {
            placement = LinkPlacement::Navigation;
        }
    }
    placement
}

/// Append-only collection of link edges, deduplicated by (source, target)
#[derive(Debug, Default)]
pub struct LinkGraph {
    edges: Vec<LinkEdge>,
    seen: HashSet<(String, String)>,
    /// target → source pages linking to it
    reverse: HashMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        LinkGraph::default()
    }

    /// Records every outbound anchor on a page as an edge
    ///
    /// Returns the number of edges newly added.
    pub fn collect(&mut self, page: &PageRecord, base_domain: &str) -> usize {
        let mut added = 0;
        for link in &page.links {
            let target = match clean_href(&page.url, &link.href) {
                Some(t) => t,
                None => continue,
            };
            let key = (page.url.clone(), target.clone());
            if self.seen.contains(&key) {
                continue;
            }

            let anchor_text = {
                let trimmed = link.anchor_text.trim();
                if trimmed.is_empty() {
                    "(no text)".to_string()
                } else {
                    trimmed.chars().take(MAX_ANCHOR_TEXT).collect()
                }
            };

            self.edges.push(LinkEdge {
                source_url: page.url.clone(),
                target_url: target.clone(),
                anchor_text,
                is_internal: is_internal(&target, base_domain),
                is_nofollow: link.is_nofollow,
                scope: classify_scope(&target, base_domain),
                placement: classify_placement(&link.ancestors),
                target_status: None,
            });
            self.reverse
                .entry(target)
                .or_default()
                .push(page.url.clone());
            self.seen.insert(key);
            added += 1;
        }
        added
    }

    /// Backfills target status codes for edges whose target has been crawled
    pub fn update_statuses(&mut self, statuses: &HashMap<String, u16>) {
        for edge in &mut self.edges {
            if edge.target_status.is_none() {
                if let Some(&status) = statuses.get(&edge.target_url) {
                    edge.target_status = Some(status);
                }
            }
        }
    }

    /// Source pages that link to the given URL
    pub fn sources_of(&self, url: &str) -> Vec<String> {
        self.reverse.get(url).cloned().unwrap_or_default()
    }

    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.seen.clear();
        self.reverse.clear();
    }
}
