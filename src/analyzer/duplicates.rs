//! Cross-page near-duplicate detection
//!
//! Naively this is O(n^2) string comparison over every page pair. Each pair
//! is scored as a weighted sum (title 0.35, description 0.35, H1 0.20,
//! word-count ratio 0.10), but after each component the maximum score still
//! reachable is recomputed assuming every remaining component scores a
//! perfect 1.0; a pair whose upper bound falls below the threshold is
//! abandoned before the expensive string ratios run. The pruning only ever
//! skips pairs that cannot reach the threshold, so the accepted set is
//! identical to the brute-force computation.

use crate::analyzer::{Issue, IssueCategory, Severity};
use crate::record::PageRecord;
use crate::url::ExclusionMatcher;
use strsim::normalized_levenshtein;
use tracing::debug;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

const WEIGHT_TITLE: f64 = 0.35;
const WEIGHT_DESC: f64 = 0.35;
const WEIGHT_H1: f64 = 0.20;
const WEIGHT_WORD_COUNT: f64 = 0.10;

/// Comparison fields extracted once per page, O(n) instead of O(n^2) work
struct Prepared {
    url: String,
    title: String,
    desc: String,
    h1: String,
    word_count: u32,
    excluded: bool,
}

fn prepare(page: &PageRecord, exclusions: &ExclusionMatcher) -> Prepared {
    Prepared {
        url: page.url.clone(),
        title: page
            .title
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .trim()
            .to_string(),
        desc: page
            .meta_description
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .trim()
            .to_string(),
        h1: page
            .first_h1()
            .unwrap_or("")
            .to_lowercase()
            .trim()
            .to_string(),
        word_count: page.word_count,
        excluded: exclusions.is_excluded(&page.url),
    }
}

/// Cheap upper bound on [`normalized_levenshtein`]
///
/// Edit distance is at least the length difference, so the exact ratio can
/// never exceed `1 - |len(a) - len(b)| / max_len`.
fn similarity_upper_bound(a: &str, b: &str) -> f64 {
    let la = a.chars().count();
    let lb = b.chars().count();
    let max = la.max(lb);
    if max == 0 {
        return 1.0;
    }
    1.0 - (la.abs_diff(lb) as f64) / (max as f64)
}

fn component_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b)
}

fn word_count_ratio(a: u32, b: u32) -> f64 {
    if a == 0 || b == 0 {
        return 0.0;
    }
    f64::from(a.min(b)) / f64::from(a.max(b))
}

/// Scores one pair with early-exit pruning
///
/// Returns the final weighted score only when it reaches the threshold.
fn score_pair(a: &Prepared, b: &Prepared, threshold: f64) -> Option<f64> {
    // Word count first, it is the cheapest component
    let wc_sim = word_count_ratio(a.word_count, b.word_count);
    let mut score = wc_sim * WEIGHT_WORD_COUNT;
    let mut max_potential = 1.0 - WEIGHT_WORD_COUNT + score;
    if max_potential < threshold {
        return None;
    }

    let title_sim = if !a.title.is_empty() && !b.title.is_empty() {
        let bound = similarity_upper_bound(&a.title, &b.title);
        if bound * WEIGHT_TITLE + (max_potential - WEIGHT_TITLE) < threshold {
            return None;
        }
        component_ratio(&a.title, &b.title)
    } else {
        0.0
    };
    score += title_sim * WEIGHT_TITLE;
    max_potential = max_potential - WEIGHT_TITLE + title_sim * WEIGHT_TITLE;
    if max_potential < threshold {
        return None;
    }

    let desc_sim = if !a.desc.is_empty() && !b.desc.is_empty() {
        let bound = similarity_upper_bound(&a.desc, &b.desc);
        if bound * WEIGHT_DESC + (max_potential - WEIGHT_DESC) < threshold {
            return None;
        }
        component_ratio(&a.desc, &b.desc)
    } else {
        0.0
    };
    score += desc_sim * WEIGHT_DESC;
    max_potential = max_potential - WEIGHT_DESC + desc_sim * WEIGHT_DESC;
    if max_potential < threshold {
        return None;
    }

    let h1_sim = component_ratio(&a.h1, &b.h1);
    score += h1_sim * WEIGHT_H1;

    if score >= threshold {
        Some(score)
    } else {
        None
    }
}

/// Compares every page pair and reports near-duplicates
///
/// Every pair at or above `threshold` yields two mirrored issues, one per
/// URL, cross-referencing the other URL and the percentage similarity.
/// Excluded URLs are skipped before any scoring.
pub fn detect(pages: &[PageRecord], exclusions: &ExclusionMatcher, threshold: f64) -> Vec<Issue> {
    let prepared: Vec<Prepared> = pages.iter().map(|p| prepare(p, exclusions)).collect();
    let mut issues = Vec::new();

    for i in 0..prepared.len() {
        let a = &prepared[i];
        if a.excluded {
            continue;
        }
        for b in prepared.iter().skip(i + 1) {
            if b.excluded {
                continue;
            }
            if let Some(score) = score_pair(a, b, threshold) {
                let pct = score * 100.0;
                issues.push(Issue::new(
                    &a.url,
                    Severity::Warning,
                    IssueCategory::Duplication,
                    "Duplicate Content Detected",
                    format!("Content is {:.1}% similar to {}", pct, b.url),
                ));
                issues.push(Issue::new(
                    &b.url,
                    Severity::Warning,
                    IssueCategory::Duplication,
                    "Duplicate Content Detected",
                    format!("Content is {:.1}% similar to {}", pct, a.url),
                ));
            }
        }
    }

    debug!(
        pages = pages.len(),
        findings = issues.len() / 2,
        "duplicate detection finished"
    );
    issues
}
