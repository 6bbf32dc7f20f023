//! Database schema definitions

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl lifecycle and progress counters
CREATE TABLE IF NOT EXISTS crawls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_url TEXT NOT NULL,
    base_domain TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    discovered INTEGER NOT NULL DEFAULT 0,
    visited INTEGER NOT NULL DEFAULT 0,
    pending INTEGER NOT NULL DEFAULT 0,
    resume_checkpoint TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawls_status ON crawls(status);

-- Audit link graph edges
CREATE TABLE IF NOT EXISTS crawl_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_id INTEGER NOT NULL REFERENCES crawls(id),
    source_url TEXT NOT NULL,
    target_url TEXT NOT NULL,
    anchor_text TEXT NOT NULL,
    is_internal INTEGER NOT NULL,
    is_nofollow INTEGER NOT NULL,
    scope TEXT NOT NULL,
    placement TEXT NOT NULL,
    target_status INTEGER,
    UNIQUE(crawl_id, source_url, target_url)
);

CREATE INDEX IF NOT EXISTS idx_crawl_links_crawl ON crawl_links(crawl_id);
CREATE INDEX IF NOT EXISTS idx_crawl_links_target ON crawl_links(target_url);

-- Analyzer findings
CREATE TABLE IF NOT EXISTS crawl_issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_id INTEGER NOT NULL REFERENCES crawls(id),
    url TEXT NOT NULL,
    severity TEXT NOT NULL,
    category TEXT NOT NULL,
    issue TEXT NOT NULL,
    details TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_issues_crawl ON crawl_issues(crawl_id);
CREATE INDEX IF NOT EXISTS idx_crawl_issues_severity ON crawl_issues(severity);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["crawls", "crawl_links", "crawl_issues"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
