//! Per-signature enqueue accounting and trap suppression

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A URL family that hit the trap threshold
///
/// Created the first time a signature's enqueued count reaches the
/// threshold; `count` is the number of matching URLs suppressed after that
/// point, so the pattern stays reportable with an example and a tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapPattern {
    pub signature: String,
    pub example_url: String,
    pub count: u64,
}

/// Counters keyed by URL signature
///
/// Serialized as part of a checkpoint so a pattern at threshold stays
/// suppressed after a resume instead of earning a fresh enqueue budget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrapTable {
    enqueued: HashMap<String, u32>,
    patterns: HashMap<String, TrapPattern>,
}

impl TrapTable {
    pub fn new() -> Self {
        TrapTable::default()
    }

    /// Reports whether a signature has exhausted its enqueue budget
    pub fn at_threshold(&self, signature: &str, threshold: u32) -> bool {
        self.enqueued
            .get(signature)
            .map(|&n| n >= threshold)
            .unwrap_or(false)
    }

    /// Counts one more enqueued URL for the signature
    pub fn record_enqueued(&mut self, signature: &str) {
        *self.enqueued.entry(signature.to_string()).or_insert(0) += 1;
    }

    /// Records a suppressed URL; creates the pattern on first suppression
    pub fn record_suppressed(&mut self, signature: &str, url: &str) {
        let pattern = self
            .patterns
            .entry(signature.to_string())
            .or_insert_with(|| TrapPattern {
                signature: signature.to_string(),
                example_url: url.to_string(),
                count: 0,
            });
        pattern.count += 1;
    }

    /// All trap patterns seen so far
    pub fn patterns(&self) -> Vec<TrapPattern> {
        let mut out: Vec<TrapPattern> = self.patterns.values().cloned().collect();
        out.sort_by(|a, b| a.signature.cmp(&b.signature));
        out
    }

    pub fn clear(&mut self) {
        self.enqueued.clear();
        self.patterns.clear();
    }
}
