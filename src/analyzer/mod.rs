//! Issue analysis: per-page rule battery and cross-page duplicate detection
//!
//! One [`Analyzer`] is constructed per crawl and shared by reference across
//! fetch workers. [`Analyzer::detect`] turns one page record into zero or
//! more categorized issues; [`Analyzer::detect_duplicates`] runs once at the
//! end of the crawl over the full page set.

pub mod duplicates;
pub mod page_type;
pub mod rules;

pub use page_type::PageType;

use crate::record::PageRecord;
use crate::url::ExclusionMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;

/// How bad a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Converts the severity to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Parses a severity from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

/// Reporting bucket for a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCategory {
    Seo,
    Technical,
    Content,
    Mobile,
    Accessibility,
    Images,
    Social,
    StructuredData,
    Performance,
    Indexability,
    Url,
    Links,
    Security,
    Duplication,
}

impl IssueCategory {
    /// Converts the category to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            IssueCategory::Seo => "SEO",
            IssueCategory::Technical => "Technical",
            IssueCategory::Content => "Content",
            IssueCategory::Mobile => "Mobile",
            IssueCategory::Accessibility => "Accessibility",
            IssueCategory::Images => "Images",
            IssueCategory::Social => "Social",
            IssueCategory::StructuredData => "Structured Data",
            IssueCategory::Performance => "Performance",
            IssueCategory::Indexability => "Indexability",
            IssueCategory::Url => "URL",
            IssueCategory::Links => "Links",
            IssueCategory::Security => "Security",
            IssueCategory::Duplication => "Duplication",
        }
    }

    /// Parses a category from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "SEO" => Some(IssueCategory::Seo),
            "Technical" => Some(IssueCategory::Technical),
            "Content" => Some(IssueCategory::Content),
            "Mobile" => Some(IssueCategory::Mobile),
            "Accessibility" => Some(IssueCategory::Accessibility),
            "Images" => Some(IssueCategory::Images),
            "Social" => Some(IssueCategory::Social),
            "Structured Data" => Some(IssueCategory::StructuredData),
            "Performance" => Some(IssueCategory::Performance),
            "Indexability" => Some(IssueCategory::Indexability),
            "URL" => Some(IssueCategory::Url),
            "Links" => Some(IssueCategory::Links),
            "Security" => Some(IssueCategory::Security),
            "Duplication" => Some(IssueCategory::Duplication),
            _ => None,
        }
    }
}

/// One finding about one URL; append-only for the duration of a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub url: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub name: String,
    pub details: String,
}

impl Issue {
    pub fn new(
        url: impl Into<String>,
        severity: Severity,
        category: IssueCategory,
        name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Issue {
            url: url.into(),
            severity,
            category,
            name: name.into(),
            details: details.into(),
        }
    }
}

/// Shared context computed once per page and read by every rule
pub struct RuleContext {
    pub page_type: PageType,
    pub is_utility: bool,
}

/// Detects issues across a crawl's pages
pub struct Analyzer {
    exclusions: ExclusionMatcher,
    issues: Mutex<Vec<Issue>>,
    /// (domain_or_url, issue_kind) keys already reported site-wide
    sitewide: Mutex<HashSet<(String, String)>>,
}

impl Analyzer {
    pub fn new(exclusions: ExclusionMatcher) -> Self {
        Analyzer {
            exclusions,
            issues: Mutex::new(Vec::new()),
            sitewide: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the full rule battery over one page
    ///
    /// Returns the page's issues and records them in the analyzer's sink.
    /// A status code of 0 short-circuits to a single connection failure; an
    /// excluded URL produces nothing.
    pub fn detect(&self, page: &PageRecord) -> Vec<Issue> {
        if self.exclusions.is_excluded(&page.url) {
            return Vec::new();
        }

        if page.status_code == 0 {
            let issue = Issue::new(
                &page.url,
                Severity::Error,
                IssueCategory::Technical,
                "Connection Failed",
                "Failed to connect to server or request blocked",
            );
            self.issues.lock().unwrap().push(issue.clone());
            return vec![issue];
        }

        let ctx = RuleContext {
            page_type: page_type::classify(&page.url),
            is_utility: page_type::is_utility(&page.url),
        };

        let mut found = Vec::new();
        rules::check_title(page, &ctx, &mut found);
        rules::check_meta_description(page, &ctx, &mut found);
        rules::check_headings(page, &ctx, &mut found);
        rules::check_content(page, &ctx, &mut found);
        rules::check_technical(page, &ctx, &mut found);
        rules::check_mobile(page, &ctx, &mut found);
        rules::check_accessibility(page, &ctx, &mut found);
        rules::check_social(page, &ctx, &mut found);
        rules::check_structured_data(page, &ctx, &mut found);
        rules::check_performance(page, &ctx, &mut found);
        rules::check_indexability(page, &ctx, &mut found);
        rules::check_url_shape(page, &ctx, &mut found);
        {
            let mut sitewide = self.sitewide.lock().unwrap();
            rules::check_links(page, &ctx, &mut sitewide, &mut found);
            rules::check_security(page, &ctx, &mut sitewide, &mut found);
        }

        debug!(url = %page.url, count = found.len(), "page analyzed");
        self.issues.lock().unwrap().extend(found.iter().cloned());
        found
    }

    /// Runs cross-page near-duplicate detection over the whole crawl
    ///
    /// Designed as a post-crawl batch step, not interleaved with live
    /// crawling. Results are appended to the analyzer's sink and returned.
    pub fn detect_duplicates(&self, pages: &[PageRecord], threshold: f64) -> Vec<Issue> {
        let found = duplicates::detect(pages, &self.exclusions, threshold);
        self.issues.lock().unwrap().extend(found.iter().cloned());
        found
    }

    /// A copy of every issue recorded so far
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.lock().unwrap().clone()
    }

    /// Clears recorded issues and the site-wide dedup guard
    pub fn reset(&self) {
        self.issues.lock().unwrap().clear();
        self.sitewide.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_page(url: &str) -> PageRecord {
        let mut page = PageRecord::connection_failed(url);
        page.status_code = 200;
        page
    }

    #[test]
    fn test_connection_failure_short_circuits() {
        let analyzer = Analyzer::new(ExclusionMatcher::default());
        let issues = analyzer.detect(&PageRecord::connection_failed("https://example.com/x"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].name, "Connection Failed");
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_excluded_urls_produce_nothing() {
        let analyzer = Analyzer::new(ExclusionMatcher::new(vec!["/staging/*".to_string()]));
        let issues = analyzer.detect(&ok_page("https://example.com/staging/test"));
        assert!(issues.is_empty());
        assert!(analyzer.issues().is_empty());
    }

    #[test]
    fn test_missing_title_severity_by_page_type() {
        let analyzer = Analyzer::new(ExclusionMatcher::default());

        let archive = analyzer.detect(&ok_page("https://example.com/category/shoes/"));
        let title_issue = archive
            .iter()
            .find(|i| i.name.starts_with("Missing Title Tag"))
            .unwrap();
        assert_eq!(title_issue.severity, Severity::Warning);

        let content = analyzer.detect(&ok_page("https://example.com/dentist-billerica/"));
        let title_issue = content
            .iter()
            .find(|i| i.name == "Missing Title Tag")
            .unwrap();
        assert_eq!(title_issue.severity, Severity::Error);
    }

    #[test]
    fn test_sitewide_csp_reported_once() {
        let analyzer = Analyzer::new(ExclusionMatcher::default());
        for i in 0..50 {
            analyzer.detect(&ok_page(&format!("https://example.com/p{}", i)));
        }
        let csp: Vec<_> = analyzer
            .issues()
            .into_iter()
            .filter(|i| i.name == "Security: Missing Content-Security-Policy")
            .collect();
        assert_eq!(csp.len(), 1);
        assert_eq!(csp[0].url, "https://example.com");
    }

    #[test]
    fn test_reset_clears_sink_and_guard() {
        let analyzer = Analyzer::new(ExclusionMatcher::default());
        analyzer.detect(&ok_page("https://example.com/a"));
        analyzer.reset();
        assert!(analyzer.issues().is_empty());

        // Site-wide findings are reportable again after reset
        analyzer.detect(&ok_page("https://example.com/b"));
        assert!(analyzer
            .issues()
            .iter()
            .any(|i| i.name == "Security: Missing Content-Security-Policy"));
    }

    #[test]
    fn test_issues_returns_copy() {
        let analyzer = Analyzer::new(ExclusionMatcher::default());
        analyzer.detect(&ok_page("https://example.com/a"));
        let mut copy = analyzer.issues();
        copy.clear();
        assert!(!analyzer.issues().is_empty());
    }

    #[test]
    fn test_severity_db_round_trip() {
        for s in [Severity::Error, Severity::Warning, Severity::Info] {
            assert_eq!(Severity::from_db_string(s.to_db_string()), Some(s));
        }
    }

    #[test]
    fn test_category_db_round_trip() {
        for c in [
            IssueCategory::Seo,
            IssueCategory::StructuredData,
            IssueCategory::Url,
            IssueCategory::Duplication,
        ] {
            assert_eq!(IssueCategory::from_db_string(c.to_db_string()), Some(c));
        }
    }
}
