//! The per-page check battery
//!
//! Each check is pure given the page record and the shared [`RuleContext`];
//! the link and security checks additionally consult the site-wide dedup
//! guard so page-independent defects are reported once per crawl. A missing
//! field never aborts a page, it only omits the dependent check.

use crate::analyzer::{Issue, IssueCategory, PageType, RuleContext, Severity};
use crate::record::PageRecord;
use crate::url::{clean_href, extract_domain, is_internal, normalize_for_comparison};
use std::collections::{HashMap, HashSet};
use url::Url;

const TITLE_MAX_CHARS: usize = 60;
const TITLE_MIN_CHARS: usize = 30;
const TITLE_MAX_PIXELS: usize = 561;
const DESCRIPTION_MAX_CHARS: usize = 155;
const DESCRIPTION_MAX_PIXELS: usize = 985;
const H1_MAX_CHARS: usize = 70;
const THIN_CONTENT_WORDS: u32 = 300;
const SLOW_RESPONSE_MS: u64 = 3000;
const LARGE_PAGE_BYTES: u64 = 3 * 1024 * 1024;
const URL_MAX_CHARS: usize = 115;
const HIGH_EXTERNAL_LINKS: usize = 50;
const APPROX_PIXELS_PER_CHAR: usize = 9;

/// Template headings that repeat legitimately across themes
const BOILERPLATE_H2S: &[&str] = &[
    "leave a reply",
    "comments",
    "recent posts",
    "related posts",
    "share this post",
    "navigate",
    "navigation",
    "menu",
    "sidebar",
    "footer",
    "search",
    "overview",
    "description",
    "reviews",
    "categories",
    "archives",
    "tags",
    "meta",
];

/// Title/H1 phrases that mark a 200 response as a likely error page
const SOFT_404_PATTERNS: &[&str] = &[
    "not found",
    "404",
    "page not found",
    "error 404",
    "page doesn't exist",
    "page does not exist",
    "no longer available",
    "has been removed",
    "could not be found",
    "cannot be found",
    "doesn't exist",
    "does not exist",
    "oops",
    "sorry",
    "nothing here",
];

const GENERIC_ANCHORS: &[&str] = &["click here", "read more", "more", "here", "link", "this", "go"];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

pub fn check_title(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let downgraded = ctx.page_type == PageType::Archive || ctx.is_utility;
    let title = page.title.as_deref().unwrap_or("");

    if title.is_empty() {
        let (severity, name, details) = if downgraded {
            (
                Severity::Warning,
                "Missing Title Tag (Archive/Utility)",
                "Page has no title tag (archive/utility page - lower priority)",
            )
        } else {
            (Severity::Error, "Missing Title Tag", "Page has no title tag")
        };
        issues.push(Issue::new(
            &page.url,
            severity,
            IssueCategory::Seo,
            name,
            details,
        ));
        return;
    }

    let len = char_len(title);
    if len > TITLE_MAX_CHARS {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Seo,
            "Page Titles: Over 60 Characters",
            format!("Title is {} characters", len),
        ));
    }
    let pixel_width = len * APPROX_PIXELS_PER_CHAR;
    if pixel_width > TITLE_MAX_PIXELS {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Seo,
            "Page Titles: Over 561 Pixels",
            format!("Title is approx {} pixels", pixel_width),
        ));
    }
    if len < TITLE_MIN_CHARS {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Seo,
            "Title Too Short",
            format!("Title is {} characters (recommended: 30-60)", len),
        ));
    }
}

pub fn check_meta_description(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let downgraded = ctx.page_type == PageType::Archive || ctx.is_utility;
    let desc = page.meta_description.as_deref().unwrap_or("");

    if desc.is_empty() {
        let (severity, name, details) = if downgraded {
            (
                Severity::Info,
                "Meta Description: Missing (Archive/Utility)",
                "Page has no meta description (archive/utility page - low priority)",
            )
        } else {
            (
                Severity::Warning,
                "Meta Description: Missing",
                "Page has no meta description",
            )
        };
        issues.push(Issue::new(
            &page.url,
            severity,
            IssueCategory::Seo,
            name,
            details,
        ));
        return;
    }

    let len = char_len(desc);
    if len > DESCRIPTION_MAX_CHARS {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Seo,
            "Meta Description: Over 155 Characters",
            format!("Description is {} characters", len),
        ));
    }
    let pixel_width = len * APPROX_PIXELS_PER_CHAR;
    if pixel_width > DESCRIPTION_MAX_PIXELS {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Seo,
            "Meta Description: Over 985 Pixels",
            format!("Description is approx {} pixels", pixel_width),
        ));
    }
}

pub fn check_headings(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let downgraded = ctx.page_type == PageType::Archive || ctx.is_utility;
    let h1_list = page.h1_texts();

    if h1_list.is_empty() {
        let (severity, name, details) = if downgraded {
            (
                Severity::Warning,
                "Missing H1 Tag (Archive/Utility)",
                "Page has no H1 heading (archive/utility - lower priority)",
            )
        } else {
            (Severity::Error, "Missing H1 Tag", "Page has no H1 heading")
        };
        issues.push(Issue::new(
            &page.url,
            severity,
            IssueCategory::Seo,
            name,
            details,
        ));
    } else if h1_list.len() > 1 {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Seo,
            "H1: Multiple",
            format!("Page has {} H1 tags", h1_list.len()),
        ));
        let unique: HashSet<&str> = h1_list.iter().copied().collect();
        if unique.len() != h1_list.len() {
            issues.push(Issue::new(
                &page.url,
                Severity::Warning,
                IssueCategory::Seo,
                "H1: Duplicate",
                "Page has duplicate H1 tags",
            ));
        }
    }

    if let Some(h1) = page.first_h1() {
        let len = char_len(h1);
        if len > H1_MAX_CHARS {
            issues.push(Issue::new(
                &page.url,
                Severity::Warning,
                IssueCategory::Seo,
                "H1: Over 70 Characters",
                format!("H1 is {} characters", len),
            ));
        }
    }

    // Sequential-structure walk; a heading may only go one level deeper
    // than the previous one
    let mut last_level: u8 = 0;
    let mut h2_texts: Vec<&str> = Vec::new();
    for heading in &page.headings {
        let level = heading.level;
        if level > last_level + 1 {
            if last_level == 0 && level != 1 {
                let (severity, name) = if downgraded {
                    (
                        Severity::Info,
                        format!("H{} appears before H1 (Archive/Utility)", level),
                    )
                } else {
                    (Severity::Warning, format!("H{} appears before H1", level))
                };
                issues.push(Issue::new(
                    &page.url,
                    severity,
                    IssueCategory::Seo,
                    name,
                    format!("The first heading is an H{}, should be H1.", level),
                ));
            } else if last_level > 0 {
                issues.push(Issue::new(
                    &page.url,
                    Severity::Warning,
                    IssueCategory::Seo,
                    format!("H{}: Non-Sequential", level),
                    format!("Heading structure skips from H{} to H{}", last_level, level),
                ));
            }
        }
        last_level = level;
        if level == 2 {
            h2_texts.push(&heading.text);
        }
    }

    if h2_texts.len() > 1 {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for text in &h2_texts {
            *counts.entry(text).or_insert(0) += 1;
        }
        let mut duplicates: Vec<&str> = counts
            .iter()
            .filter(|(_, &c)| c > 1)
            .map(|(&t, _)| t)
            .collect();
        duplicates.sort();

        if !duplicates.is_empty() {
            let non_boilerplate: Vec<&str> = duplicates
                .iter()
                .copied()
                .filter(|d| !BOILERPLATE_H2S.contains(&d.to_lowercase().trim()))
                .collect();

            if !non_boilerplate.is_empty() {
                let (severity, name, suffix) = if downgraded {
                    (
                        Severity::Info,
                        "H2: Duplicate (Archive/Utility)",
                        " (archive/utility - low priority)",
                    )
                } else {
                    (Severity::Warning, "H2: Duplicate", "")
                };
                issues.push(Issue::new(
                    &page.url,
                    severity,
                    IssueCategory::Seo,
                    name,
                    format!(
                        "Page has duplicate H2 tags: {}{}",
                        non_boilerplate.join(", "),
                        suffix
                    ),
                ));
            } else {
                issues.push(Issue::new(
                    &page.url,
                    Severity::Info,
                    IssueCategory::Seo,
                    "H2: Duplicate (Boilerplate)",
                    format!("Duplicate template headings found: {}", duplicates.join(", ")),
                ));
            }
        }
    }
}

pub fn check_content(page: &PageRecord, _ctx: &RuleContext, issues: &mut Vec<Issue>) {
    if page.word_count < THIN_CONTENT_WORDS {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Content,
            "Thin Content",
            format!(
                "Page has only {} words (recommended: at least 300)",
                page.word_count
            ),
        ));
    }
}

fn status_code_message(status: u16) -> String {
    let known = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        410 => "Gone",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return format!("HTTP {} Error", status),
    };
    known.to_string()
}

fn header_noindex(page: &PageRecord) -> bool {
    page.header("x-robots-tag")
        .map(|v| v.to_lowercase().contains("noindex"))
        .unwrap_or(false)
}

pub fn check_technical(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let status = page.status_code;
    match status {
        400..=499 => issues.push(Issue::new(
            &page.url,
            Severity::Error,
            IssueCategory::Technical,
            "Response Codes: External Client Error (4xx)",
            status_code_message(status),
        )),
        500..=599 => issues.push(Issue::new(
            &page.url,
            Severity::Error,
            IssueCategory::Technical,
            "Response Codes: External Server Error (5xx)",
            status_code_message(status),
        )),
        300..=399 => issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Technical,
            "Response Codes: Internal Redirection (3xx)",
            "URL redirects to another location",
        )),
        _ => {}
    }

    // Soft 404: a 200 whose title or H1 reads like an error page
    if status == 200 {
        let title = page.title.as_deref().unwrap_or("");
        let h1 = page.first_h1().unwrap_or("");
        let title_lower = title.to_lowercase();
        let h1_lower = h1.to_lowercase();
        let error_title = SOFT_404_PATTERNS.iter().any(|p| title_lower.contains(p));
        let error_h1 = SOFT_404_PATTERNS.iter().any(|p| h1_lower.contains(p));

        if error_title || error_h1 {
            let (severity, details) = if error_title && error_h1 {
                (
                    Severity::Error,
                    format!(
                        "Title: \"{}\" and H1: \"{}\" suggest error page",
                        truncate_chars(title, 50),
                        truncate_chars(h1, 50)
                    ),
                )
            } else if error_title {
                (
                    Severity::Warning,
                    format!(
                        "Title \"{}\" suggests this is an error page",
                        truncate_chars(title, 60)
                    ),
                )
            } else {
                (
                    Severity::Warning,
                    format!(
                        "H1 \"{}\" suggests this is an error page",
                        truncate_chars(h1, 60)
                    ),
                )
            };
            issues.push(Issue::new(
                &page.url,
                severity,
                IssueCategory::Technical,
                "Soft 404: Returns 200 but appears broken",
                details,
            ));
        }
    }

    check_redirect_chain(page, issues);
    check_canonical(page, ctx, issues);
}

fn check_redirect_chain(page: &PageRecord, issues: &mut Vec<Issue>) {
    let chain = &page.redirect_chain;
    if chain.len() < 2 {
        return;
    }
    let redirect_count = chain.len() - 1;

    let mut seen = HashSet::new();
    let mut loop_url = None;
    for hop in chain {
        let normalized = normalize_for_comparison(&hop.url);
        if !seen.insert(normalized) {
            loop_url = Some(hop.url.clone());
            break;
        }
    }

    if let Some(loop_url) = loop_url {
        issues.push(Issue::new(
            &page.url,
            Severity::Error,
            IssueCategory::Technical,
            "Redirect Loop Detected",
            format!("URL redirects back to itself: {}", loop_url),
        ));
        return;
    }

    let chain_summary = chain
        .iter()
        .map(|h| h.status_code.to_string())
        .collect::<Vec<_>>()
        .join(" -> ");
    if redirect_count > 3 {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Technical,
            "Long Redirect Chain",
            format!(
                "{} redirects before final destination. Chain: {}",
                redirect_count, chain_summary
            ),
        ));
    } else if redirect_count > 1 {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Technical,
            "Redirect Chain",
            format!("{} redirects: {}", redirect_count, chain_summary),
        ));
    }
}

fn check_canonical(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let canonical = page.canonical_url.as_deref().unwrap_or("");
    let is_noindex = page.noindex || header_noindex(page);

    if canonical.is_empty() {
        // Noindexed pages don't strictly need a canonical
        if is_noindex {
            return;
        }
        let (severity, details) = match ctx.page_type {
            PageType::Important => (
                Severity::Error,
                "Indexable content page has no canonical URL",
            ),
            PageType::Archive => (
                Severity::Warning,
                "Archive page missing canonical (Review if this should be indexed)",
            ),
            PageType::Other => (Severity::Error, "Page has no canonical URL specified"),
        };
        issues.push(Issue::new(
            &page.url,
            severity,
            IssueCategory::Technical,
            "Missing Canonical URL",
            details,
        ));
        return;
    }

    if normalize_for_comparison(canonical) == normalize_for_comparison(&page.url) {
        return;
    }

    let mut severity = Severity::Warning;
    let mut details = format!("Page is canonicalised to: {}", canonical);

    if let (Ok(p_url), Ok(p_can)) = (Url::parse(&page.url), Url::parse(canonical)) {
        let same_host = p_url.host_str() == p_can.host_str() && p_url.port() == p_can.port();
        if (p_can.path() == "" || p_can.path() == "/")
            && !(p_url.path() == "" || p_url.path() == "/")
        {
            severity = Severity::Error;
            details =
                "Critical: Content page canonicalises to Homepage (Soft 404 risk)".to_string();
        } else if canonical.contains("__trashed") {
            severity = Severity::Error;
            details = "Critical: Canonical points to a trashed post URL".to_string();
        } else if p_url.scheme() == p_can.scheme() && same_host && p_url.path() == p_can.path() {
            severity = Severity::Info;
            details = "Safe: Canonical removes query parameters or fragments".to_string();
        } else if same_host && p_url.path().trim_matches('/') == p_can.path().trim_matches('/') {
            severity = Severity::Info;
            details = "Safe: Canonical normalizes slash or protocol".to_string();
        }
    }

    issues.push(Issue::new(
        &page.url,
        severity,
        IssueCategory::Technical,
        "Canonicals: Canonicalised",
        details,
    ));
}

pub fn check_mobile(page: &PageRecord, _ctx: &RuleContext, issues: &mut Vec<Issue>) {
    if page.viewport.as_deref().unwrap_or("").is_empty() {
        issues.push(Issue::new(
            &page.url,
            Severity::Error,
            IssueCategory::Mobile,
            "Missing Viewport Meta Tag",
            "Page is not mobile-optimized",
        ));
    }
}

pub fn check_accessibility(page: &PageRecord, _ctx: &RuleContext, issues: &mut Vec<Issue>) {
    if page.lang.as_deref().unwrap_or("").is_empty() {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Accessibility,
            "Missing Language Attribute",
            "Template issue: HTML tag missing lang attribute (accessibility best practice)",
        ));
    }

    let missing_alt = page
        .images
        .iter()
        .filter(|img| img.alt.as_deref().unwrap_or("").is_empty())
        .count();
    let missing_size = page.images.iter().filter(|img| !img.has_dimensions).count();

    if missing_alt > 0 {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Images,
            "Images: Missing Alt Text",
            format!("{} images lack alt text", missing_alt),
        ));
    }
    if missing_size > 0 {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Images,
            "Images: Missing Size Attributes",
            format!("{} images lack width/height attributes", missing_size),
        ));
    }
}

pub fn check_social(page: &PageRecord, _ctx: &RuleContext, issues: &mut Vec<Issue>) {
    if page.og_tags.is_empty() {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Social,
            "Missing OpenGraph Tags",
            "Page has no OpenGraph tags for social sharing",
        ));
    }
    if page.twitter_tags.is_empty() {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Social,
            "Missing Twitter Card Tags",
            "Page has no Twitter Card tags",
        ));
    }
}

pub fn check_structured_data(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    if page.structured_data.is_empty() {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::StructuredData,
            "No Structured Data",
            "Page has no JSON-LD or Schema.org markup",
        ));
        return;
    }

    let types: HashSet<&str> = page
        .structured_data
        .iter()
        .map(|b| b.schema_type.as_str())
        .collect();
    let has_organization = types.contains("Organization")
        || types.contains("LocalBusiness")
        || types.contains("Corporation");
    let has_website = types.contains("WebSite");
    let is_content_schema = types.contains("Article")
        || types.contains("BlogPosting")
        || types.contains("Product");

    if ctx.page_type == PageType::Important
        && !has_organization
        && !has_website
        && !is_content_schema
    {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::StructuredData,
            "Schema: Missing Organization/WebSite",
            "Consider adding Organization or WebSite schema for brand visibility",
        ));
    }

    if types.contains("FAQPage") {
        let question_count: usize = page
            .structured_data
            .iter()
            .filter(|b| b.schema_type == "FAQPage")
            .map(|b| b.question_count)
            .sum();
        if question_count == 0 {
            issues.push(Issue::new(
                &page.url,
                Severity::Warning,
                IssueCategory::StructuredData,
                "Schema: FAQPage has no questions",
                "FAQPage schema found but no Question items detected",
            ));
        } else if question_count < 3 {
            issues.push(Issue::new(
                &page.url,
                Severity::Info,
                IssueCategory::StructuredData,
                "Schema: FAQPage has few questions",
                format!("Only {} FAQ items found (3+ recommended)", question_count),
            ));
        }
    }

    let article_types = ["Article", "BlogPosting", "NewsArticle"];
    if article_types.iter().any(|t| types.contains(t)) {
        let complete = page.structured_data.iter().any(|b| {
            article_types.contains(&b.schema_type.as_str())
                && b.has_headline
                && b.has_date_published
        });
        if !complete {
            issues.push(Issue::new(
                &page.url,
                Severity::Warning,
                IssueCategory::StructuredData,
                "Schema: Article missing required fields",
                "Article schema should have headline and datePublished",
            ));
        }
    }
}

pub fn check_performance(page: &PageRecord, _ctx: &RuleContext, issues: &mut Vec<Issue>) {
    if let Some(response_time) = page.response_time_ms {
        if response_time > SLOW_RESPONSE_MS {
            issues.push(Issue::new(
                &page.url,
                Severity::Error,
                IssueCategory::Performance,
                "Slow Response Time",
                format!(
                    "Page took {}ms to respond (recommended: <3000ms)",
                    response_time
                ),
            ));
        }
    }
    if let Some(size) = page.size_bytes {
        if size > LARGE_PAGE_BYTES {
            issues.push(Issue::new(
                &page.url,
                Severity::Error,
                IssueCategory::Performance,
                "Large Page Size",
                format!(
                    "Page size is {:.1}MB (recommended: <3MB)",
                    size as f64 / 1024.0 / 1024.0
                ),
            ));
        }
    }
}

pub fn check_indexability(page: &PageRecord, ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let header_directives = page
        .header("x-robots-tag")
        .map(|v| v.to_lowercase())
        .unwrap_or_default();

    let meta_noindex = page.noindex;
    let hdr_noindex = header_directives.contains("noindex");
    if meta_noindex || hdr_noindex {
        let source = directive_sources(meta_noindex, hdr_noindex);
        let (severity, details) = match ctx.page_type {
            PageType::Archive => (
                Severity::Info,
                format!("Source: {} (Expected for archive page)", source),
            ),
            PageType::Important => (
                Severity::Error,
                format!("Source: {} (Critical: Important page is blocked!)", source),
            ),
            PageType::Other => (Severity::Warning, format!("Source: {}", source)),
        };
        issues.push(Issue::new(
            &page.url,
            severity,
            IssueCategory::Indexability,
            "Directives: Noindex",
            details,
        ));
    }

    let meta_nofollow = page.nofollow;
    let hdr_nofollow = header_directives.contains("nofollow");
    if meta_nofollow || hdr_nofollow {
        let source = directive_sources(meta_nofollow, hdr_nofollow);
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Indexability,
            "Directives: Nofollow",
            format!("Source: {}", source),
        ));
    }
}

fn directive_sources(from_meta: bool, from_header: bool) -> String {
    let mut sources = Vec::new();
    if from_meta {
        sources.push("HTML Meta Tag");
    }
    if from_header {
        sources.push("HTTP Header (X-Robots-Tag)");
    }
    sources.join(" & ")
}

pub fn check_url_shape(page: &PageRecord, _ctx: &RuleContext, issues: &mut Vec<Issue>) {
    let url = &page.url;
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();

    if char_len(url) > URL_MAX_CHARS {
        issues.push(Issue::new(
            url,
            Severity::Info,
            IssueCategory::Url,
            "URL: Over 115 Characters",
            format!("URL is {} characters long", char_len(url)),
        ));
    }
    if path.contains('_') {
        issues.push(Issue::new(
            url,
            Severity::Info,
            IssueCategory::Url,
            "URL: Underscores",
            "URL contains underscores (use hyphens instead)",
        ));
    }
    if url.contains('?') {
        issues.push(Issue::new(
            url,
            Severity::Info,
            IssueCategory::Url,
            "URL: Parameters",
            "URL contains query parameters",
        ));
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let unique: HashSet<&str> = segments.iter().copied().collect();
    if segments.len() != unique.len() {
        issues.push(Issue::new(
            url,
            Severity::Info,
            IssueCategory::Url,
            "URL: Repetitive Path",
            "URL path contains duplicate segments",
        ));
    }
}

pub fn check_links(
    page: &PageRecord,
    _ctx: &RuleContext,
    sitewide: &mut HashSet<(String, String)>,
    issues: &mut Vec<Issue>,
) {
    let page_domain = match extract_domain(&page.url) {
        Ok(d) => d,
        Err(_) => return,
    };

    let mut external_count = 0usize;
    let mut internal_nofollow = 0usize;
    let mut empty_anchors = 0usize;
    let mut generic_anchors = 0usize;
    let mut unsafe_domains: Vec<String> = Vec::new();

    for link in &page.links {
        let resolved = match clean_href(&page.url, &link.href) {
            Some(r) => r,
            None => continue,
        };
        let internal = is_internal(&resolved, &page_domain);
        let text = link.anchor_text.trim().to_lowercase();

        if !internal {
            external_count += 1;
        }
        if internal && link.is_nofollow {
            internal_nofollow += 1;
        }
        if text.is_empty() {
            empty_anchors += 1;
        }
        if internal && GENERIC_ANCHORS.contains(&text.as_str()) {
            generic_anchors += 1;
        }
        if link.opens_new_tab && !internal && !link.has_noopener {
            if let Ok(domain) = extract_domain(&resolved) {
                if !unsafe_domains.contains(&domain) {
                    unsafe_domains.push(domain);
                }
            }
        }
    }

    if external_count > HIGH_EXTERNAL_LINKS {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Links,
            "Links: Pages With High External Outlinks",
            format!("Page has {} external links", external_count),
        ));
    }
    if internal_nofollow > 0 {
        issues.push(Issue::new(
            &page.url,
            Severity::Info,
            IssueCategory::Links,
            "Links: Internal Nofollow Outlinks",
            format!("{} internal links are marked nofollow", internal_nofollow),
        ));
    }
    if empty_anchors > 0 {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Links,
            "Links: Internal Outlinks With No Anchor Text",
            format!("{} links have no anchor text", empty_anchors),
        ));
    }
    if generic_anchors > 0 {
        issues.push(Issue::new(
            &page.url,
            Severity::Warning,
            IssueCategory::Links,
            "Links: Non-Descriptive Anchor Text",
            format!(
                "{} links use generic text like \"click here\"",
                generic_anchors
            ),
        ));
    }

    // One finding per external domain per crawl, not per page
    for domain in unsafe_domains {
        let key = (domain.clone(), "unsafe_cross_origin".to_string());
        if sitewide.insert(key) {
            issues.push(Issue::new(
                &page.url,
                Severity::Info,
                IssueCategory::Security,
                "Security: Unsafe Cross-Origin Links",
                format!(
                    "External domain {} opens in new tab without rel=\"noopener\" (Best practice recommendation)",
                    domain
                ),
            ));
        }
    }
}

pub fn check_security(
    page: &PageRecord,
    _ctx: &RuleContext,
    sitewide: &mut HashSet<(String, String)>,
    issues: &mut Vec<Issue>,
) {
    let (scheme, domain) = match Url::parse(&page.url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => (parsed.scheme().to_string(), host.to_lowercase()),
            None => return,
        },
        Err(_) => return,
    };
    let site_url = format!("{}://{}", scheme, domain);
    let is_https = scheme == "https";

    if page.header("content-security-policy").is_none() {
        let key = (domain.clone(), "missing_csp".to_string());
        if sitewide.insert(key) {
            issues.push(Issue::new(
                &site_url,
                Severity::Info,
                IssueCategory::Security,
                "Security: Missing Content-Security-Policy",
                "Server does not send Content-Security-Policy header. This is a site-wide configuration issue.",
            ));
        }
    }

    if is_https && page.header("strict-transport-security").is_none() {
        let key = (domain.clone(), "missing_hsts".to_string());
        if sitewide.insert(key) {
            issues.push(Issue::new(
                &site_url,
                Severity::Warning,
                IssueCategory::Security,
                "Security: Missing HSTS Header",
                "HTTP Strict Transport Security (HSTS) is not enabled. Users effectively can be downgraded to HTTP.",
            ));
        }
    }

    if page.header("x-frame-options").is_none() {
        let key = (domain, "missing_xfo".to_string());
        if sitewide.insert(key) {
            issues.push(Issue::new(
                &site_url,
                Severity::Info,
                IssueCategory::Security,
                "Security: Missing X-Frame-Options",
                "Missing X-Frame-Options header can leave the site vulnerable to Clickjacking.",
            ));
        }
    }

    if is_https {
        let mut mixed: Vec<String> = Vec::new();
        for img in &page.images {
            if img.src.starts_with("http://") {
                mixed.push(format!("Image: {}", img.src));
            }
        }
        for resource in &page.resource_urls {
            if resource.starts_with("http://") {
                mixed.push(format!("Resource: {}", resource));
            }
        }

        let protocol_relative = page
            .images
            .iter()
            .map(|i| i.src.as_str())
            .chain(page.resource_urls.iter().map(|r| r.as_str()))
            .chain(page.links.iter().map(|l| l.href.as_str()))
            .filter(|u| u.starts_with("//"))
            .count();

        if !mixed.is_empty() {
            let mut details_str = mixed
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if mixed.len() > 5 {
                details_str.push_str(&format!(", and {} more", mixed.len() - 5));
            }
            issues.push(Issue::new(
                &page.url,
                Severity::Error,
                IssueCategory::Security,
                "Security: Mixed Content",
                format!("Secure page loads insecure (HTTP) assets: {}", details_str),
            ));
        }

        if protocol_relative > 0 {
            issues.push(Issue::new(
                &page.url,
                Severity::Warning,
                IssueCategory::Security,
                "Security: Protocol-Relative Resource Links",
                format!(
                    "{} resources use protocol-relative URLs (//). Use explicit HTTPS instead.",
                    protocol_relative
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Heading, ImageRef, OutboundLink, RedirectHop, StructuredDataBlock};

    fn ctx_for(url: &str) -> RuleContext {
        RuleContext {
            page_type: crate::analyzer::page_type::classify(url),
            is_utility: crate::analyzer::page_type::is_utility(url),
        }
    }

    fn ok_page(url: &str) -> PageRecord {
        let mut page = PageRecord::connection_failed(url);
        page.status_code = 200;
        page
    }

    fn run<F>(check: F, page: &PageRecord) -> Vec<Issue>
    where
        F: Fn(&PageRecord, &RuleContext, &mut Vec<Issue>),
    {
        let mut issues = Vec::new();
        check(page, &ctx_for(&page.url), &mut issues);
        issues
    }

    #[test]
    fn test_title_length_bands() {
        let mut page = ok_page("https://example.com/post-one");
        page.title = Some("a".repeat(70));
        let issues = run(check_title, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Page Titles: Over 60 Characters"));
        assert!(issues.iter().any(|i| i.name == "Page Titles: Over 561 Pixels"));

        page.title = Some("short".to_string());
        let issues = run(check_title, &page);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].name, "Title Too Short");

        page.title = Some("a".repeat(45));
        assert!(run(check_title, &page).is_empty());
    }

    #[test]
    fn test_pixel_band_triggers_at_63_chars() {
        // 63 * 9 = 567 > 561, while 62 * 9 = 558 does not
        let mut page = ok_page("https://example.com/post-one");
        page.title = Some("a".repeat(63));
        assert!(run(check_title, &page)
            .iter()
            .any(|i| i.name == "Page Titles: Over 561 Pixels"));

        page.title = Some("a".repeat(62));
        assert!(!run(check_title, &page)
            .iter()
            .any(|i| i.name == "Page Titles: Over 561 Pixels"));
    }

    #[test]
    fn test_meta_description_missing_downgraded_on_archive() {
        let page = ok_page("https://example.com/tag/sale/");
        let issues = run(check_meta_description, &page);
        assert_eq!(issues[0].severity, Severity::Info);

        let page = ok_page("https://example.com/dentist-billerica/");
        let issues = run(check_meta_description, &page);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_heading_level_skip() {
        let mut page = ok_page("https://example.com/post-one");
        page.headings = vec![
            Heading {
                level: 1,
                text: "Top".to_string(),
            },
            Heading {
                level: 3,
                text: "Deep".to_string(),
            },
        ];
        let issues = run(check_headings, &page);
        assert!(issues.iter().any(|i| i.name == "H3: Non-Sequential"));
    }

    #[test]
    fn test_first_heading_not_h1() {
        let mut page = ok_page("https://example.com/post-one");
        page.headings = vec![Heading {
            level: 2,
            text: "Intro".to_string(),
        }];
        let issues = run(check_headings, &page);
        assert!(issues.iter().any(|i| i.name == "H2 appears before H1"));
    }

    #[test]
    fn test_boilerplate_h2_dupes_downgraded() {
        let mut page = ok_page("https://example.com/post-one");
        page.headings = vec![
            Heading {
                level: 1,
                text: "Top".to_string(),
            },
            Heading {
                level: 2,
                text: "Comments".to_string(),
            },
            Heading {
                level: 2,
                text: "Comments".to_string(),
            },
        ];
        let issues = run(check_headings, &page);
        let dup = issues.iter().find(|i| i.name.starts_with("H2: Duplicate")).unwrap();
        assert_eq!(dup.name, "H2: Duplicate (Boilerplate)");
        assert_eq!(dup.severity, Severity::Info);
    }

    #[test]
    fn test_content_h2_dupes_warn() {
        let mut page = ok_page("https://example.com/post-one");
        page.headings = vec![
            Heading {
                level: 1,
                text: "Top".to_string(),
            },
            Heading {
                level: 2,
                text: "Pricing".to_string(),
            },
            Heading {
                level: 2,
                text: "Pricing".to_string(),
            },
        ];
        let issues = run(check_headings, &page);
        let dup = issues.iter().find(|i| i.name == "H2: Duplicate").unwrap();
        assert_eq!(dup.severity, Severity::Warning);
    }

    #[test]
    fn test_soft_404_severity_ladder() {
        let mut page = ok_page("https://example.com/post-one");
        page.title = Some("Page Not Found".to_string());
        page.headings = vec![Heading {
            level: 1,
            text: "Oops".to_string(),
        }];
        let issues = run(check_technical, &page);
        let soft = issues
            .iter()
            .find(|i| i.name.starts_with("Soft 404"))
            .unwrap();
        assert_eq!(soft.severity, Severity::Error);

        page.headings = vec![Heading {
            level: 1,
            text: "Welcome".to_string(),
        }];
        let issues = run(check_technical, &page);
        let soft = issues
            .iter()
            .find(|i| i.name.starts_with("Soft 404"))
            .unwrap();
        assert_eq!(soft.severity, Severity::Warning);
    }

    #[test]
    fn test_status_class_issues() {
        let mut page = ok_page("https://example.com/gone");
        page.status_code = 404;
        let issues = run(check_technical, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Response Codes: External Client Error (4xx)"
                && i.details == "Not Found"));

        page.status_code = 301;
        let issues = run(check_technical, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Response Codes: Internal Redirection (3xx)"
                && i.severity == Severity::Info));
    }

    #[test]
    fn test_redirect_loop_and_chain() {
        let mut page = ok_page("https://example.com/a");
        page.redirect_chain = vec![
            RedirectHop {
                url: "https://example.com/a".to_string(),
                status_code: 301,
            },
            RedirectHop {
                url: "https://example.com/b".to_string(),
                status_code: 301,
            },
            RedirectHop {
                url: "https://example.com/A/".to_string(),
                status_code: 301,
            },
        ];
        let issues = run(check_technical, &page);
        assert!(issues.iter().any(|i| i.name == "Redirect Loop Detected"));

        page.redirect_chain = (0..5)
            .map(|i| RedirectHop {
                url: format!("https://example.com/hop{}", i),
                status_code: 301,
            })
            .collect();
        let issues = run(check_technical, &page);
        assert!(issues.iter().any(|i| i.name == "Long Redirect Chain"));
    }

    #[test]
    fn test_canonical_missing_skipped_for_noindex() {
        let mut page = ok_page("https://example.com/post-one");
        page.noindex = true;
        let issues = run(check_technical, &page);
        assert!(!issues.iter().any(|i| i.name == "Missing Canonical URL"));
    }

    #[test]
    fn test_canonical_to_homepage_is_error() {
        let mut page = ok_page("https://example.com/deep/post");
        page.canonical_url = Some("https://example.com/".to_string());
        let issues = run(check_technical, &page);
        let canonical = issues
            .iter()
            .find(|i| i.name == "Canonicals: Canonicalised")
            .unwrap();
        assert_eq!(canonical.severity, Severity::Error);
    }

    #[test]
    fn test_canonical_query_strip_is_safe() {
        let mut page = ok_page("https://example.com/post-one?utm=x");
        page.canonical_url = Some("https://example.com/post-one".to_string());
        let issues = run(check_technical, &page);
        let canonical = issues
            .iter()
            .find(|i| i.name == "Canonicals: Canonicalised")
            .unwrap();
        assert_eq!(canonical.severity, Severity::Info);
    }

    #[test]
    fn test_canonical_case_only_difference_is_clean() {
        let mut page = ok_page("https://example.com/Post-One/");
        page.canonical_url = Some("https://example.com/post-one".to_string());
        let issues = run(check_technical, &page);
        assert!(!issues.iter().any(|i| i.name == "Canonicals: Canonicalised"));
    }

    #[test]
    fn test_noindex_severity_by_page_type() {
        let mut page = ok_page("https://example.com/category/shoes/");
        page.noindex = true;
        let issues = run(check_indexability, &page);
        assert_eq!(issues[0].severity, Severity::Info);

        let mut page = ok_page("https://example.com/about-us/");
        page.noindex = true;
        let issues = run(check_indexability, &page);
        assert_eq!(issues[0].severity, Severity::Error);

        let mut page = ok_page("https://example.com/docs/v2/guide/");
        page.noindex = true;
        let issues = run(check_indexability, &page);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_noindex_from_header_only() {
        let mut page = ok_page("https://example.com/docs/v2/guide/");
        page.headers
            .insert("x-robots-tag".to_string(), "noindex, nofollow".to_string());
        let issues = run(check_indexability, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Directives: Noindex"
                && i.details.contains("X-Robots-Tag")));
        assert!(issues.iter().any(|i| i.name == "Directives: Nofollow"));
    }

    #[test]
    fn test_url_shape_findings() {
        let page = ok_page("https://example.com/foo/foo/my_page?x=1");
        let issues = run(check_url_shape, &page);
        assert!(issues.iter().any(|i| i.name == "URL: Underscores"));
        assert!(issues.iter().any(|i| i.name == "URL: Parameters"));
        assert!(issues.iter().any(|i| i.name == "URL: Repetitive Path"));
    }

    #[test]
    fn test_generic_anchor_detection() {
        let mut page = ok_page("https://example.com/post-one");
        page.links = vec![
            OutboundLink {
                href: "/other".to_string(),
                anchor_text: "Click Here".to_string(),
                is_nofollow: false,
                opens_new_tab: false,
                has_noopener: false,
                ancestors: Vec::new(),
            },
            OutboundLink {
                href: "/third".to_string(),
                anchor_text: "Our pricing guide".to_string(),
                is_nofollow: false,
                opens_new_tab: false,
                has_noopener: false,
                ancestors: Vec::new(),
            },
        ];
        let mut sitewide = HashSet::new();
        let mut issues = Vec::new();
        check_links(&page, &ctx_for(&page.url), &mut sitewide, &mut issues);
        let generic = issues
            .iter()
            .find(|i| i.name == "Links: Non-Descriptive Anchor Text")
            .unwrap();
        assert!(generic.details.starts_with("1 links"));
    }

    #[test]
    fn test_unsafe_cross_origin_deduped_by_domain() {
        let make_page = |url: &str| {
            let mut page = ok_page(url);
            page.links = vec![OutboundLink {
                href: "https://partner.net/promo".to_string(),
                anchor_text: "Partner".to_string(),
                is_nofollow: false,
                opens_new_tab: true,
                has_noopener: false,
                ancestors: Vec::new(),
            }];
            page
        };
        let mut sitewide = HashSet::new();
        let mut issues = Vec::new();
        for i in 0..3 {
            let page = make_page(&format!("https://example.com/p{}", i));
            check_links(&page, &ctx_for(&page.url), &mut sitewide, &mut issues);
        }
        let unsafe_issues: Vec<_> = issues
            .iter()
            .filter(|i| i.name == "Security: Unsafe Cross-Origin Links")
            .collect();
        assert_eq!(unsafe_issues.len(), 1);
    }

    #[test]
    fn test_hsts_only_checked_on_https() {
        let page = ok_page("http://example.com/a");
        let mut sitewide = HashSet::new();
        let mut issues = Vec::new();
        check_security(&page, &ctx_for(&page.url), &mut sitewide, &mut issues);
        assert!(!issues.iter().any(|i| i.name == "Security: Missing HSTS Header"));
        assert!(issues
            .iter()
            .any(|i| i.name == "Security: Missing Content-Security-Policy"));
    }

    #[test]
    fn test_mixed_content_detection() {
        let mut page = ok_page("https://example.com/a");
        page.images = vec![ImageRef {
            src: "http://cdn.example.com/pic.png".to_string(),
            alt: Some("pic".to_string()),
            has_dimensions: true,
        }];
        page.resource_urls = vec!["//cdn.example.com/app.js".to_string()];
        let mut sitewide = HashSet::new();
        let mut issues = Vec::new();
        check_security(&page, &ctx_for(&page.url), &mut sitewide, &mut issues);
        assert!(issues
            .iter()
            .any(|i| i.name == "Security: Mixed Content" && i.severity == Severity::Error));
        assert!(issues
            .iter()
            .any(|i| i.name == "Security: Protocol-Relative Resource Links"));
    }

    #[test]
    fn test_faq_schema_validation() {
        let mut page = ok_page("https://example.com/faq-page");
        page.structured_data = vec![StructuredDataBlock {
            schema_type: "FAQPage".to_string(),
            question_count: 0,
            has_headline: false,
            has_date_published: false,
        }];
        let issues = run(check_structured_data, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Schema: FAQPage has no questions"));

        page.structured_data[0].question_count = 2;
        let issues = run(check_structured_data, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Schema: FAQPage has few questions"));
    }

    #[test]
    fn test_article_schema_required_fields() {
        let mut page = ok_page("https://example.com/2024/01/15/my-post/");
        page.structured_data = vec![StructuredDataBlock {
            schema_type: "BlogPosting".to_string(),
            question_count: 0,
            has_headline: true,
            has_date_published: false,
        }];
        let issues = run(check_structured_data, &page);
        assert!(issues
            .iter()
            .any(|i| i.name == "Schema: Article missing required fields"));
    }

    #[test]
    fn test_performance_thresholds() {
        let mut page = ok_page("https://example.com/slow");
        page.response_time_ms = Some(3500);
        page.size_bytes = Some(4 * 1024 * 1024);
        let issues = run(check_performance, &page);
        assert!(issues.iter().any(|i| i.name == "Slow Response Time"));
        assert!(issues
            .iter()
            .any(|i| i.name == "Large Page Size" && i.details.contains("4.0MB")));
    }
}
