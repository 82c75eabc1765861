use crate::error::{ChangegenError, Result};
use crate::model::SCHEMA_VERSION;
use crate::rewrite::ContentKind;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

const DB_FILE_NAME: &str = "rewrites.db";

/// Rewritten entries keyed by commit, style and provider, so re-runs skip
/// the text-generation call for commits already seen.
pub struct RewriteCache {
    conn: Connection,
}

impl RewriteCache {
    pub fn new<CP: AsRef<Path>, DP: AsRef<Path>>(cache_path: Option<CP>, document_dir: DP) -> Result<Self> {
        let cache_dir = match cache_path {
            Some(path) => path.as_ref().to_path_buf(),
            None => document_dir.as_ref().join(".changegen"),
        };
        std::fs::create_dir_all(&cache_dir)?;
        let conn = Connection::open(cache_dir.join(DB_FILE_NAME))?;
        let mut cache = Self { conn };
        cache.initialize()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self> {
        let mut cache = Self {
            conn: Connection::open_in_memory()?,
        };
        cache.initialize()?;
        Ok(cache)
    }

    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS rewrites (
                commit_id TEXT NOT NULL,
                style TEXT NOT NULL,
                provider TEXT NOT NULL,
                kind TEXT NOT NULL,
                entry TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (commit_id, style, provider, kind)
            );
            ",
        )?;
        self.check_schema_version()?;
        Ok(())
    }

    fn check_schema_version(&mut self) -> Result<()> {
        let user_version: i64 = self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        if user_version == 0 {
            let set_stmt = format!("PRAGMA user_version = {SCHEMA_VERSION};");
            self.conn.execute_batch(&set_stmt)?;
        } else if user_version != SCHEMA_VERSION as i64 {
            return Err(ChangegenError::Cache(format!(
                "Schema version mismatch: expected {}, found {}",
                SCHEMA_VERSION, user_version
            )));
        }

        Ok(())
    }

    pub fn get(&self, commit_id: &str, style: &str, provider: &str, kind: ContentKind) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT entry FROM rewrites WHERE commit_id = ? AND style = ? AND provider = ? AND kind = ?",
            params![commit_id, style, provider, kind.as_str()],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn put(&self, commit_id: &str, style: &str, provider: &str, kind: ContentKind, entry: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO rewrites (commit_id, style, provider, kind, entry, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![commit_id, style, provider, kind.as_str(), entry, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM rewrites", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stores_and_reads_entries() {
        let cache = RewriteCache::in_memory().unwrap();
        assert!(cache.is_empty().unwrap());
        cache.put("abc", "regular", "openai", ContentKind::Commit, "- Added x").unwrap();
        assert_eq!(
            cache.get("abc", "regular", "openai", ContentKind::Commit).unwrap().as_deref(),
            Some("- Added x")
        );
        assert_eq!(cache.get("abc", "playful", "openai", ContentKind::Commit).unwrap(), None);
        assert_eq!(cache.get("abc", "regular", "anthropic", ContentKind::Commit).unwrap(), None);
    }

    #[test]
    fn replaces_existing_entry() {
        let cache = RewriteCache::in_memory().unwrap();
        cache.put("abc", "regular", "openai", ContentKind::Commit, "- old").unwrap();
        cache.put("abc", "regular", "openai", ContentKind::Commit, "- new").unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(
            cache.get("abc", "regular", "openai", ContentKind::Commit).unwrap().as_deref(),
            Some("- new")
        );
    }

    #[test]
    fn persists_on_disk() {
        let dir = tempdir().unwrap();
        {
            let cache = RewriteCache::new(None::<&Path>, dir.path()).unwrap();
            cache.put("abc", "regular", "offline", ContentKind::Commit, "- kept").unwrap();
        }
        assert!(dir.path().join(".changegen").join(DB_FILE_NAME).exists());
        let reopened = RewriteCache::new(None::<&Path>, dir.path()).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
    }

    #[test]
    fn rejects_foreign_schema_version() {
        let dir = tempdir().unwrap();
        {
            let conn = Connection::open(dir.path().join(DB_FILE_NAME)).unwrap();
            conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        }
        let err = RewriteCache::new(Some(dir.path()), dir.path()).err().unwrap();
        assert!(matches!(err, ChangegenError::Cache(_)));
    }
}
