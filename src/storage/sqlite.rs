//! SQLite implementation of the crawl store
//!
//! The connection sits behind a mutex so one store can be shared across
//! worker tasks through `Arc<dyn CrawlStore>`. Batch writes run inside a
//! single transaction.

use crate::analyzer::{Issue, IssueCategory, Severity};
use crate::frontier::{FrontierStats, LinkEdge, LinkPlacement};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CrawlStore, StorageResult};
use crate::storage::{CrawlRow, CrawlStatus};
use crate::url::LinkScope;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at the given path
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_crawl(row: &Row<'_>) -> rusqlite::Result<CrawlRow> {
        Ok(CrawlRow {
            id: row.get(0)?,
            base_url: row.get(1)?,
            base_domain: row.get(2)?,
            config_hash: row.get(3)?,
            status: CrawlStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(CrawlStatus::Running),
            started_at: row.get(5)?,
            completed_at: row.get(6)?,
            discovered: row.get::<_, i64>(7)? as u64,
            visited: row.get::<_, i64>(8)? as u64,
            pending: row.get::<_, i64>(9)? as u64,
        })
    }
}

const CRAWL_COLUMNS: &str = "id, base_url, base_domain, config_hash, status, started_at, \
     completed_at, discovered, visited, pending";

impl CrawlStore for SqliteStore {
    fn create_crawl(
        &self,
        base_url: &str,
        base_domain: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO crawls (base_url, base_domain, config_hash, status, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                base_url,
                base_domain,
                config_hash,
                CrawlStatus::Running.to_db_string(),
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_crawl(&self, crawl_id: i64) -> StorageResult<Option<CrawlRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM crawls WHERE id = ?1",
            CRAWL_COLUMNS
        ))?;
        let crawl = stmt
            .query_row(params![crawl_id], Self::row_to_crawl)
            .optional()?;
        Ok(crawl)
    }

    fn set_status(&self, crawl_id: i64, status: CrawlStatus) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        if status.is_terminal() {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE crawls SET status = ?1, completed_at = ?2 WHERE id = ?3",
                params![status.to_db_string(), now, crawl_id],
            )?;
        } else {
            conn.execute(
                "UPDATE crawls SET status = ?1, completed_at = NULL WHERE id = ?2",
                params![status.to_db_string(), crawl_id],
            )?;
        }
        Ok(())
    }

    fn update_stats(&self, crawl_id: i64, stats: &FrontierStats) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE crawls SET discovered = ?1, visited = ?2, pending = ?3 WHERE id = ?4",
            params![
                stats.discovered as i64,
                stats.visited as i64,
                stats.pending as i64,
                crawl_id
            ],
        )?;
        Ok(())
    }

    fn save_checkpoint(&self, crawl_id: i64, blob: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE crawls SET resume_checkpoint = ?1 WHERE id = ?2",
            params![blob, crawl_id],
        )?;
        Ok(())
    }

    fn load_checkpoint(&self, crawl_id: i64) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let blob: Option<Option<String>> = conn
            .query_row(
                "SELECT resume_checkpoint FROM crawls WHERE id = ?1",
                params![crawl_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(blob.flatten())
    }

    fn save_links_batch(&self, crawl_id: i64, links: &[LinkEdge]) -> StorageResult<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO crawl_links (
                    crawl_id, source_url, target_url, anchor_text,
                    is_internal, is_nofollow, scope, placement, target_status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for link in links {
                written += stmt.execute(params![
                    crawl_id,
                    link.source_url,
                    link.target_url,
                    link.anchor_text,
                    link.is_internal,
                    link.is_nofollow,
                    link.scope.to_db_string(),
                    link.placement.to_db_string(),
                    link.target_status,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    fn save_issues_batch(&self, crawl_id: i64, issues: &[Issue]) -> StorageResult<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO crawl_issues (crawl_id, url, severity, category, issue, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for issue in issues {
                stmt.execute(params![
                    crawl_id,
                    issue.url,
                    issue.severity.to_db_string(),
                    issue.category.to_db_string(),
                    issue.name,
                    issue.details,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(issues.len())
    }

    fn load_links(&self, crawl_id: i64) -> StorageResult<Vec<LinkEdge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT source_url, target_url, anchor_text, is_internal, is_nofollow,
                    scope, placement, target_status
             FROM crawl_links WHERE crawl_id = ?1 ORDER BY id",
        )?;
        let links = stmt
            .query_map(params![crawl_id], |row| {
                Ok(LinkEdge {
                    source_url: row.get(0)?,
                    target_url: row.get(1)?,
                    anchor_text: row.get(2)?,
                    is_internal: row.get(3)?,
                    is_nofollow: row.get(4)?,
                    scope: LinkScope::from_db_string(&row.get::<_, String>(5)?)
                        .unwrap_or(LinkScope::External),
                    placement: LinkPlacement::from_db_string(&row.get::<_, String>(6)?)
                        .unwrap_or(LinkPlacement::Body),
                    target_status: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    fn load_issues(&self, crawl_id: i64) -> StorageResult<Vec<Issue>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT url, severity, category, issue, details
             FROM crawl_issues WHERE crawl_id = ?1 ORDER BY id",
        )?;
        let issues = stmt
            .query_map(params![crawl_id], |row| {
                Ok(Issue {
                    url: row.get(0)?,
                    severity: Severity::from_db_string(&row.get::<_, String>(1)?)
                        .unwrap_or(Severity::Info),
                    category: IssueCategory::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(IssueCategory::Technical),
                    name: row.get(3)?,
                    details: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(issues)
    }

    fn find_crashed_crawls(&self) -> StorageResult<Vec<CrawlRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM crawls WHERE status = ?1 ORDER BY id",
            CRAWL_COLUMNS
        ))?;
        let crawls = stmt
            .query_map(
                params![CrawlStatus::Running.to_db_string()],
                Self::row_to_crawl,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(crawls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn edge(source: &str, target: &str) -> LinkEdge {
        LinkEdge {
            source_url: source.to_string(),
            target_url: target.to_string(),
            anchor_text: "link".to_string(),
            is_internal: true,
            is_nofollow: false,
            scope: LinkScope::Root,
            placement: LinkPlacement::Body,
            target_status: None,
        }
    }

    #[test]
    fn test_create_and_get_crawl() {
        let store = store();
        let id = store
            .create_crawl("https://example.com/", "example.com", "abc123")
            .unwrap();
        let crawl = store.get_crawl(id).unwrap().unwrap();
        assert_eq!(crawl.base_domain, "example.com");
        assert_eq!(crawl.status, CrawlStatus::Running);
        assert!(crawl.completed_at.is_none());
    }

    #[test]
    fn test_get_missing_crawl_is_none() {
        assert!(store().get_crawl(999).unwrap().is_none());
    }

    #[test]
    fn test_terminal_status_sets_completed_at() {
        let store = store();
        let id = store
            .create_crawl("https://example.com/", "example.com", "abc")
            .unwrap();
        store.set_status(id, CrawlStatus::Completed).unwrap();
        let crawl = store.get_crawl(id).unwrap().unwrap();
        assert_eq!(crawl.status, CrawlStatus::Completed);
        assert!(crawl.completed_at.is_some());
    }

    #[test]
    fn test_update_stats() {
        let store = store();
        let id = store
            .create_crawl("https://example.com/", "example.com", "abc")
            .unwrap();
        store
            .update_stats(
                id,
                &FrontierStats {
                    discovered: 10,
                    visited: 4,
                    pending: 6,
                },
            )
            .unwrap();
        let crawl = store.get_crawl(id).unwrap().unwrap();
        assert_eq!(crawl.discovered, 10);
        assert_eq!(crawl.visited, 4);
        assert_eq!(crawl.pending, 6);
    }

    #[test]
    fn test_checkpoint_blob_round_trip() {
        let store = store();
        let id = store
            .create_crawl("https://example.com/", "example.com", "abc")
            .unwrap();
        assert!(store.load_checkpoint(id).unwrap().is_none());
        store.save_checkpoint(id, "{\"visited\":[]}").unwrap();
        assert_eq!(
            store.load_checkpoint(id).unwrap().unwrap(),
            "{\"visited\":[]}"
        );
        store.save_checkpoint(id, "{\"visited\":[\"a\"]}").unwrap();
        assert_eq!(
            store.load_checkpoint(id).unwrap().unwrap(),
            "{\"visited\":[\"a\"]}"
        );
    }

    #[test]
    fn test_links_batch_dedups_on_conflict() {
        let store = store();
        let id = store
            .create_crawl("https://example.com/", "example.com", "abc")
            .unwrap();
        let links = vec![
            edge("https://example.com/a", "https://example.com/b"),
            edge("https://example.com/a", "https://example.com/b"),
            edge("https://example.com/a", "https://example.com/c"),
        ];
        let written = store.save_links_batch(id, &links).unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.load_links(id).unwrap().len(), 2);
    }

    #[test]
    fn test_issues_batch_round_trip() {
        let store = store();
        let id = store
            .create_crawl("https://example.com/", "example.com", "abc")
            .unwrap();
        let issues = vec![Issue::new(
            "https://example.com/a",
            Severity::Warning,
            IssueCategory::Seo,
            "Title Too Short",
            "Title is 5 characters (recommended: 30-60)",
        )];
        store.save_issues_batch(id, &issues).unwrap();
        let loaded = store.load_issues(id).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].severity, Severity::Warning);
        assert_eq!(loaded[0].category, IssueCategory::Seo);
        assert_eq!(loaded[0].name, "Title Too Short");
    }

    #[test]
    fn test_find_crashed_crawls() {
        let store = store();
        let a = store
            .create_crawl("https://a.com/", "a.com", "h1")
            .unwrap();
        let b = store
            .create_crawl("https://b.com/", "b.com", "h2")
            .unwrap();
        store.set_status(b, CrawlStatus::Completed).unwrap();

        let crashed = store.find_crashed_crawls().unwrap();
        assert_eq!(crashed.len(), 1);
        assert_eq!(crashed[0].id, a);
    }
}
