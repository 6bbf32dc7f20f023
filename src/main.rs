//! Crawlplane main entry point
//!
//! Command-line interface for the crawlplane audit control plane. Fetched
//! page records arrive as a JSONL file; this binary drives the frontier,
//! the issue analyzer, and checkpointing against a SQLite database.

use anyhow::{bail, Context};
use clap::Parser;
use crawlplane::analyzer::Analyzer;
use crawlplane::checkpoint::CheckpointCoordinator;
use crawlplane::config::{load_config_with_hash, Config};
use crawlplane::frontier::Frontier;
use crawlplane::record::PageRecord;
use crawlplane::storage::{CrawlStatus, CrawlStore, SqliteStore};
use crawlplane::url::{extract_domain, is_internal, ExclusionMatcher};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawlplane: control plane for an SEO-auditing site crawler
///
/// Crawlplane schedules URLs with crawl-trap suppression, runs an SEO issue
/// battery over fetched pages, detects near-duplicate content, and keeps
/// crash-safe checkpoints so interrupted audits can resume.
#[derive(Parser, Debug)]
#[command(name = "crawlplane")]
#[command(version = "0.3.0")]
#[command(about = "Control plane for an SEO site auditor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Fetched page records, one JSON object per line
    #[arg(long, value_name = "FILE")]
    pages: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume the most recent interrupted crawl for this site
    #[arg(long)]
    resume: bool,

    /// List crawls still marked running (crash candidates) and exit
    #[arg(long, conflicts_with = "stats")]
    crashed: bool,

    /// Show statistics for a crawl ID and exit
    #[arg(long, value_name = "CRAWL_ID")]
    stats: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.crashed {
        handle_crashed(&config)?;
    } else if let Some(crawl_id) = cli.stats {
        handle_stats(&config, crawl_id)?;
    } else {
        handle_audit(config, config_hash, cli.pages, cli.resume)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawlplane=info,warn"),
            1 => EnvFilter::new("crawlplane=debug,info"),
            2 => EnvFilter::new("crawlplane=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --crashed mode: lists crawls that look interrupted
fn handle_crashed(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let crashed = store.find_crashed_crawls()?;

    if crashed.is_empty() {
        println!("No interrupted crawls found.");
        return Ok(());
    }

    println!("Interrupted crawls ({}):", crashed.len());
    for crawl in &crashed {
        println!(
            "  #{} {} started {} ({} visited, {} pending)",
            crawl.id, crawl.base_url, crawl.started_at, crawl.visited, crawl.pending
        );
    }
    println!("\nRe-run with --resume to continue the most recent one.");

    Ok(())
}

/// Handles the --stats mode: prints a crawl's progress and issue counts
fn handle_stats(config: &Config, crawl_id: i64) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let crawl = store
        .get_crawl(crawl_id)?
        .with_context(|| format!("no crawl with ID {}", crawl_id))?;

    println!("Crawl #{}: {}", crawl.id, crawl.base_url);
    println!("  Status:     {}", crawl.status.to_db_string());
    println!("  Started:    {}", crawl.started_at);
    if let Some(completed) = &crawl.completed_at {
        println!("  Completed:  {}", completed);
    }
    println!("  Discovered: {}", crawl.discovered);
    println!("  Visited:    {}", crawl.visited);
    println!("  Pending:    {}", crawl.pending);

    let issues = store.load_issues(crawl_id)?;
    let mut by_severity: HashMap<&str, usize> = HashMap::new();
    for issue in &issues {
        *by_severity.entry(issue.severity.to_db_string()).or_default() += 1;
    }
    println!("  Issues:     {}", issues.len());
    for severity in ["error", "warning", "info"] {
        if let Some(count) = by_severity.get(severity) {
            println!("    {:8} {}", severity, count);
        }
    }

    let links = store.load_links(crawl_id)?;
    println!("  Links:      {}", links.len());

    Ok(())
}

/// Handles the main audit operation
fn handle_audit(
    config: Config,
    config_hash: String,
    pages_path: Option<PathBuf>,
    resume: bool,
) -> anyhow::Result<()> {
    let pages_path = pages_path.context("--pages FILE is required to run an audit")?;
    let mut pages = read_page_records(&pages_path)?;
    tracing::info!("Loaded {} page records from {}", pages.len(), pages_path.display());

    let store = open_store(&config)?;
    let base_domain = extract_domain(&config.crawl.base_url)?;
    let frontier = Frontier::new(base_domain.clone(), config.crawl.trap_threshold);

    let crawl_id = if resume {
        resume_crawl(&store, &frontier, &config)?
    } else {
        None
    };
    let crawl_id = match crawl_id {
        Some(id) => id,
        None => {
            let id = store.create_crawl(&config.crawl.base_url, &base_domain, &config_hash)?;
            frontier.seed(&config.crawl.seeds);
            tracing::info!(crawl_id = id, "starting fresh crawl of {}", base_domain);
            id
        }
    };

    let coordinator = CheckpointCoordinator::new(Arc::clone(&store), crawl_id);
    let matcher = ExclusionMatcher::new(config.analysis.exclusion_patterns.clone());
    let analyzer = Analyzer::new(ExclusionMatcher::new(
        config.analysis.exclusion_patterns.clone(),
    ));

    let mut analyzed: Vec<PageRecord> = Vec::new();
    let mut statuses: HashMap<String, u16> = HashMap::new();
    let mut processed = 0usize;

    while let Some((url, depth)) = frontier.next_url() {
        if frontier.is_visited(&url) {
            continue;
        }
        let page = match pages.remove(&url) {
            Some(page) => page,
            None => {
                tracing::debug!(url = %url, "no fetched record for URL");
                continue;
            }
        };

        frontier.mark_visited(&url);
        statuses.insert(url.clone(), page.status_code);

        analyzer.detect(&page);
        frontier.collect_all_links(&page);
        if depth < config.crawl.max_depth {
            frontier.extract_links(&page, |candidate| {
                is_internal(candidate, &base_domain) && !matcher.is_excluded(candidate)
            });
        }
        analyzed.push(page);

        processed += 1;
        if processed % config.crawl.checkpoint_interval_pages == 0 {
            coordinator.save(&frontier)?;
            store.update_stats(crawl_id, &frontier.stats())?;
        }
    }

    tracing::info!(processed, "traversal complete, running post-crawl analysis");
    frontier.backfill_link_statuses(&statuses);
    analyzer.detect_duplicates(&analyzed, config.analysis.similarity_threshold);

    let issues = analyzer.issues();
    let links = frontier.links();
    let written_links = store.save_links_batch(crawl_id, &links)?;
    let written_issues = store.save_issues_batch(crawl_id, &issues)?;
    coordinator.save(&frontier)?;
    store.update_stats(crawl_id, &frontier.stats())?;
    store.set_status(crawl_id, CrawlStatus::Completed)?;

    let stats = frontier.stats();
    println!("Audit complete for {}", config.crawl.base_url);
    println!("  Pages analyzed: {}", processed);
    println!("  Discovered:     {}", stats.discovered);
    println!("  Issues found:   {}", written_issues);
    println!("  Links recorded: {}", written_links);
    let traps = frontier.traps();
    if !traps.is_empty() {
        println!("  Trap patterns:  {}", traps.len());
        for trap in &traps {
            println!(
                "    {} suppressed {} (e.g. {})",
                trap.signature, trap.count, trap.example_url
            );
        }
    }

    Ok(())
}

/// Finds the most recent crashed crawl for this site and restores its
/// checkpoint into the frontier
fn resume_crawl(
    store: &Arc<dyn CrawlStore>,
    frontier: &Frontier,
    config: &Config,
) -> anyhow::Result<Option<i64>> {
    let crashed = store.find_crashed_crawls()?;
    let candidate = crashed
        .into_iter()
        .filter(|c| c.base_url == config.crawl.base_url)
        .max_by_key(|c| c.id);

    let crawl = match candidate {
        Some(crawl) => crawl,
        None => {
            tracing::warn!("--resume requested but no interrupted crawl found");
            return Ok(None);
        }
    };

    let coordinator = CheckpointCoordinator::new(Arc::clone(store), crawl.id);
    if coordinator.resume_into(frontier)? {
        Ok(Some(crawl.id))
    } else {
        tracing::warn!(crawl_id = crawl.id, "no usable checkpoint, starting fresh");
        Ok(None)
    }
}

/// Opens the SQLite store configured under `[output]`
fn open_store(config: &Config) -> anyhow::Result<Arc<dyn CrawlStore>> {
    let path = Path::new(&config.output.database_path);
    let store = SqliteStore::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Reads page records from a JSONL file, keyed by URL
///
/// Blank lines are skipped; a malformed line aborts the run rather than
/// silently dropping a page.
fn read_page_records(path: &Path) -> anyhow::Result<HashMap<String, PageRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut pages = HashMap::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PageRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed page record", path.display(), line_no + 1))?;
        if pages.insert(record.url.clone(), record).is_some() {
            bail!("{}:{}: duplicate page record", path.display(), line_no + 1);
        }
    }
    Ok(pages)
}
