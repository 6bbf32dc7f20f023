//! The crawl frontier: single source of truth for what to crawl next
//!
//! All methods take `&self`; interior mutability keeps the traversal state
//! (visited/discovered sets, pending queue, trap counters) behind one lock
//! so "is this URL new" and "reserve this URL" are checked-and-set
//! atomically. The audit link graph lives behind a separate lock so
//! link-graph bookkeeping never blocks the traversal hot path.

pub mod links;
pub mod traps;

pub use links::{classify_placement, LinkEdge, LinkGraph, LinkPlacement};
pub use traps::{TrapPattern, TrapTable};

use crate::checkpoint::Checkpoint;
use crate::record::PageRecord;
use crate::url::{clean_href, url_signature};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tracing::debug;

/// Counts exposed for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierStats {
    pub discovered: usize,
    pub visited: usize,
    pub pending: usize,
}

/// A known URL: its discovery depth and the pages that link to it
#[derive(Debug, Clone, Default)]
struct FrontierEntry {
    depth: u32,
    sources: HashSet<String>,
}

/// Traversal-decision state, mutated as one atomic unit
#[derive(Debug, Default)]
struct Traversal {
    visited: HashSet<String>,
    discovered: HashSet<String>,
    pending: VecDeque<(String, u32)>,
    entries: HashMap<String, FrontierEntry>,
    traps: TrapTable,
}

/// The crawl frontier
///
/// Constructed once per crawl and shared by reference across fetch workers.
pub struct Frontier {
    traversal: Mutex<Traversal>,
    links: Mutex<LinkGraph>,
    base_domain: String,
    trap_threshold: u32,
}

impl Frontier {
    /// Creates an empty frontier for a crawl of the given base domain
    pub fn new(base_domain: impl Into<String>, trap_threshold: u32) -> Self {
        Frontier {
            traversal: Mutex::new(Traversal::default()),
            links: Mutex::new(LinkGraph::new()),
            base_domain: base_domain.into(),
            trap_threshold,
        }
    }

    /// Enqueues the crawl's seed URLs at depth 0
    pub fn seed(&self, urls: &[String]) {
        let mut t = self.traversal.lock().unwrap();
        for url in urls {
            if t.discovered.insert(url.clone()) {
                t.entries.entry(url.clone()).or_default();
                t.pending.push_back((url.clone(), 0));
            }
        }
    }

    /// Processes a fetched page's outbound anchors for traversal
    ///
    /// Each anchor is resolved to an absolute http(s) URL; URLs not yet seen
    /// are enqueued at `depth + 1` unless their signature is at the trap
    /// threshold or the policy predicate rejects them. Returns the number of
    /// URLs enqueued.
    pub fn extract_links<F>(&self, page: &PageRecord, should_crawl: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut t = self.traversal.lock().unwrap();
        let depth = t
            .entries
            .get(&page.url)
            .map(|e| e.depth)
            .unwrap_or(0);

        let mut enqueued = 0;
        for link in &page.links {
            let url = match clean_href(&page.url, &link.href) {
                Some(u) => u,
                None => continue,
            };
            if url == page.url {
                continue;
            }

            let entry = t.entries.entry(url.clone()).or_insert_with(|| FrontierEntry {
                depth: depth + 1,
                sources: HashSet::new(),
            });
            entry.sources.insert(page.url.clone());

            if t.visited.contains(&url) || t.discovered.contains(&url) {
                continue;
            }

            let signature = url_signature(&url);
            if t.traps.at_threshold(&signature, self.trap_threshold) {
                debug!(url = %url, signature = %signature, "suppressing trap URL");
                t.traps.record_suppressed(&signature, &url);
                continue;
            }
            if !should_crawl(&url) {
                continue;
            }

            t.traps.record_enqueued(&signature);
            t.discovered.insert(url.clone());
            t.pending.push_back((url, depth + 1));
            enqueued += 1;
        }
        enqueued
    }

    /// Hands out the next pending URL, each to exactly one caller
    pub fn next_url(&self) -> Option<(String, u32)> {
        self.traversal.lock().unwrap().pending.pop_front()
    }

    /// Marks a URL as visited; idempotent
    pub fn mark_visited(&self, url: &str) {
        let mut t = self.traversal.lock().unwrap();
        t.visited.insert(url.to_string());
        t.discovered.insert(url.to_string());
    }

    /// Records every outbound anchor on a page in the audit link graph
    ///
    /// Independent of the enqueue decision; never applies trap filtering.
    pub fn collect_all_links(&self, page: &PageRecord) -> usize {
        self.links.lock().unwrap().collect(page, &self.base_domain)
    }

    /// Backfills target status codes onto collected edges
    pub fn backfill_link_statuses(&self, statuses: &HashMap<String, u16>) {
        self.links.lock().unwrap().update_statuses(statuses);
    }

    /// A copy of all collected link edges
    pub fn links(&self) -> Vec<LinkEdge> {
        self.links.lock().unwrap().edges().to_vec()
    }

    /// Pages known to link to the given URL
    pub fn source_pages(&self, url: &str) -> Vec<String> {
        let t = self.traversal.lock().unwrap();
        let mut sources: Vec<String> = t
            .entries
            .get(url)
            .map(|e| e.sources.iter().cloned().collect())
            .unwrap_or_default();
        sources.sort();
        sources
    }

    /// Trap patterns observed so far
    pub fn traps(&self) -> Vec<TrapPattern> {
        self.traversal.lock().unwrap().traps.patterns()
    }

    pub fn stats(&self) -> FrontierStats {
        let t = self.traversal.lock().unwrap();
        FrontierStats {
            discovered: t.discovered.len(),
            visited: t.visited.len(),
            pending: t.pending.len(),
        }
    }

    /// Whether a URL has already been fetched
    pub fn is_visited(&self, url: &str) -> bool {
        self.traversal.lock().unwrap().visited.contains(url)
    }

    /// Clears all traversal state and the link graph
    pub fn reset(&self) {
        let mut t = self.traversal.lock().unwrap();
        t.visited.clear();
        t.discovered.clear();
        t.pending.clear();
        t.entries.clear();
        t.traps.clear();
        drop(t);
        self.links.lock().unwrap().clear();
    }

    /// Takes a consistent snapshot of traversal state for checkpointing
    ///
    /// The snapshot is built under the traversal lock; serialization and the
    /// durable write happen outside it.
    pub fn snapshot(&self) -> Checkpoint {
        let t = self.traversal.lock().unwrap();
        let mut visited: Vec<String> = t.visited.iter().cloned().collect();
        visited.sort();
        let mut discovered: Vec<String> = t.discovered.iter().cloned().collect();
        discovered.sort();
        Checkpoint {
            visited,
            discovered,
            pending: t.pending.iter().cloned().collect(),
            traps: t.traps.clone(),
            discovered_count: t.discovered.len() as u64,
            visited_count: t.visited.len() as u64,
        }
    }

    /// Re-seeds traversal state from a checkpoint
    ///
    /// Existing state is replaced; call before workers start pulling from
    /// [`Frontier::next_url`].
    pub fn restore(&self, checkpoint: &Checkpoint) {
        let mut t = self.traversal.lock().unwrap();
        t.visited = checkpoint.visited.iter().cloned().collect();
        t.discovered = checkpoint.discovered.iter().cloned().collect();
        t.pending = checkpoint.pending.iter().cloned().collect();
        t.entries = checkpoint
            .pending
            .iter()
            .map(|(url, depth)| {
                (
                    url.clone(),
                    FrontierEntry {
                        depth: *depth,
                        sources: HashSet::new(),
                    },
                )
            })
            .collect();
        t.traps = checkpoint.traps.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OutboundLink;
    use std::sync::Arc;

    fn page_with_links(url: &str, hrefs: &[String]) -> PageRecord {
        let mut page = PageRecord::connection_failed(url);
        page.status_code = 200;
        page.links = hrefs
            .iter()
            .map(|h| OutboundLink {
                href: h.clone(),
                anchor_text: "link".to_string(),
                is_nofollow: false,
                opens_new_tab: false,
                has_noopener: false,
                ancestors: Vec::new(),
            })
            .collect();
        page
    }

    #[test]
    fn test_seed_enqueues_at_depth_zero() {
        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&["https://example.com/".to_string()]);
        assert_eq!(
            frontier.next_url(),
            Some(("https://example.com/".to_string(), 0))
        );
        assert_eq!(frontier.next_url(), None);
    }

    #[test]
    fn test_extract_links_enqueues_once() {
        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&["https://example.com/".to_string()]);
        frontier.next_url();
        frontier.mark_visited("https://example.com/");

        let page = page_with_links(
            "https://example.com/",
            &["/about".to_string(), "/about".to_string()],
        );
        assert_eq!(frontier.extract_links(&page, |_| true), 1);
        // Second pass over the same page enqueues nothing
        assert_eq!(frontier.extract_links(&page, |_| true), 0);

        assert_eq!(
            frontier.next_url(),
            Some(("https://example.com/about".to_string(), 1))
        );
    }

    #[test]
    fn test_extract_links_respects_policy() {
        let frontier = Frontier::new("example.com", 25);
        let page = page_with_links("https://example.com/", &["/private".to_string()]);
        assert_eq!(frontier.extract_links(&page, |_| false), 0);
        assert_eq!(frontier.next_url(), None);
    }

    #[test]
    fn test_trap_suppression_counts() {
        let frontier = Frontier::new("example.com", 5);
        let hrefs: Vec<String> = (1..=20).map(|i| format!("/blog/post-{}", i)).collect();
        let page = page_with_links("https://example.com/", &hrefs);

        assert_eq!(frontier.extract_links(&page, |_| true), 5);

        let traps = frontier.traps();
        assert_eq!(traps.len(), 1);
        assert_eq!(traps[0].count, 15);
        assert_eq!(traps[0].example_url, "https://example.com/blog/post-6");
    }

    #[test]
    fn test_trap_suppression_survives_restore() {
        let frontier = Frontier::new("example.com", 5);
        let hrefs: Vec<String> = (1..=10).map(|i| format!("/blog/post-{}", i)).collect();
        frontier.extract_links(&page_with_links("https://example.com/", &hrefs), |_| true);

        let checkpoint = frontier.snapshot();
        let resumed = Frontier::new("example.com", 5);
        resumed.restore(&checkpoint);

        // The signature's enqueue budget is already spent
        let more: Vec<String> = (11..=15).map(|i| format!("/blog/post-{}", i)).collect();
        let enqueued =
            resumed.extract_links(&page_with_links("https://example.com/other", &more), |_| true);
        assert_eq!(enqueued, 0);
        assert_eq!(resumed.traps()[0].count, 10);
    }

    #[test]
    fn test_mark_visited_is_idempotent_and_keeps_invariant() {
        let frontier = Frontier::new("example.com", 25);
        frontier.mark_visited("https://example.com/a");
        frontier.mark_visited("https://example.com/a");
        let stats = frontier.stats();
        assert_eq!(stats.visited, 1);
        // visited URLs are always part of the discovered set
        assert_eq!(stats.discovered, 1);
    }

    #[test]
    fn test_visited_urls_are_not_reenqueued() {
        let frontier = Frontier::new("example.com", 25);
        frontier.mark_visited("https://example.com/done");
        let page = page_with_links("https://example.com/", &["/done".to_string()]);
        assert_eq!(frontier.extract_links(&page, |_| true), 0);
    }

    #[test]
    fn test_source_pages_reverse_lookup() {
        let frontier = Frontier::new("example.com", 25);
        let a = page_with_links("https://example.com/a", &["/shared".to_string()]);
        let b = page_with_links("https://example.com/b", &["/shared".to_string()]);
        frontier.extract_links(&a, |_| true);
        frontier.extract_links(&b, |_| true);
        assert_eq!(
            frontier.source_pages("https://example.com/shared"),
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string()
            ]
        );
    }

    #[test]
    fn test_atomic_handoff_under_concurrent_workers() {
        let frontier = Arc::new(Frontier::new("example.com", 100));
        let seeds: Vec<String> = (0..50).map(|i| format!("https://example.com/p{}", i)).collect();
        frontier.seed(&seeds);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let frontier = Arc::clone(&frontier);
            handles.push(std::thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some((url, _)) = frontier.next_url() {
                    taken.push(url);
                }
                taken
            }));
        }

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        let mut expected = seeds.clone();
        expected.sort();
        // Every URL delivered exactly once across all workers
        assert_eq!(all, expected);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let frontier = Frontier::new("example.com", 25);
        for i in 0..3 {
            frontier.mark_visited(&format!("https://example.com/v{}", i));
        }
        let hrefs: Vec<String> = (0..4).map(|i| format!("/d{}", i)).collect();
        frontier.extract_links(&page_with_links("https://example.com/v0", &hrefs), |_| true);
        frontier.next_url();
        frontier.next_url();

        let checkpoint = frontier.snapshot();
        let resumed = Frontier::new("example.com", 25);
        resumed.restore(&checkpoint);

        assert_eq!(resumed.stats(), frontier.stats());
        let mut rest = Vec::new();
        while let Some(entry) = resumed.next_url() {
            rest.push(entry);
        }
        assert_eq!(
            rest,
            vec![
                ("https://example.com/d2".to_string(), 1),
                ("https://example.com/d3".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&["https://example.com/".to_string()]);
        frontier.mark_visited("https://example.com/x");
        frontier.reset();
        let stats = frontier.stats();
        assert_eq!(stats.discovered, 0);
        assert_eq!(stats.visited, 0);
        assert_eq!(stats.pending, 0);
    }
}
