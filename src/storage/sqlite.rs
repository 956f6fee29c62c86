//! SQLite storage implementation

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord, SiteStatus};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
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

        Ok(Self { conn })
    }

    /// Creates an in-memory database (used by tests)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn map_site(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
        let status_str: String = row.get(3)?;
        Ok(SiteRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            name: row.get(2)?,
            status: SiteStatus::from_db_string(&status_str).unwrap_or(SiteStatus::Failed),
            status_time: row.get(4)?,
            last_error: row.get(5)?,
        })
    }

    fn map_page(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
        Ok(PageRecord {
            id: row.get(0)?,
            site_id: row.get(1)?,
            path: row.get(2)?,
            code: row.get(3)?,
            content: row.get(4)?,
        })
    }

    fn map_lemma(row: &Row<'_>) -> rusqlite::Result<LemmaRecord> {
        Ok(LemmaRecord {
            id: row.get(0)?,
            site_id: row.get(1)?,
            lemma: row.get(2)?,
            frequency: row.get(3)?,
        })
    }

    fn map_index(row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
        Ok(IndexRecord {
            id: row.get(0)?,
            page_id: row.get(1)?,
            lemma_id: row.get(2)?,
            rank: row.get(3)?,
        })
    }
}

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const LEMMA_COLUMNS: &str = "id, site_id, lemma, frequency";
const INDEX_COLUMNS: &str = "id, page_id, lemma_id, rank";

impl Storage for SqliteStorage {
    // ===== Transactions =====

    fn begin(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ===== Sites =====

    fn save_site(&mut self, site: &mut SiteRecord) -> StorageResult<()> {
        if site.id == 0 {
            self.conn.execute(
                "INSERT INTO sites (url, name, status, status_time, last_error)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    site.url,
                    site.name,
                    site.status.to_db_string(),
                    site.status_time,
                    site.last_error,
                ],
            )?;
            site.id = self.conn.last_insert_rowid();
        } else {
            self.conn.execute(
                "UPDATE sites SET url = ?1, name = ?2, status = ?3, status_time = ?4,
                 last_error = ?5 WHERE id = ?6",
                params![
                    site.url,
                    site.name,
                    site.status.to_db_string(),
                    site.status_time,
                    site.last_error,
                    site.id,
                ],
            )?;
        }
        Ok(())
    }

    fn delete_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM sites WHERE id = ?1", params![site_id])?;
        Ok(())
    }

    fn delete_site_by_url(&mut self, url: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM sites WHERE url = ?1", params![url])?;
        Ok(())
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites WHERE url = ?1");
        let site = self
            .conn
            .query_row(&sql, params![url], Self::map_site)
            .optional()?;
        Ok(site)
    }

    fn find_site_by_id(&self, id: i64) -> StorageResult<Option<SiteRecord>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1");
        let site = self
            .conn
            .query_row(&sql, params![id], Self::map_site)
            .optional()?;
        Ok(site)
    }

    fn all_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let sites = stmt
            .query_map([], Self::map_site)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn has_sites(&self) -> StorageResult<bool> {
        let exists: i64 = self
            .conn
            .query_row("SELECT EXISTS(SELECT 1 FROM sites)", [], |row| row.get(0))?;
        Ok(exists != 0)
    }

    // ===== Pages =====

    fn save_page(&mut self, page: &mut PageRecord) -> StorageResult<()> {
        if page.id == 0 {
            self.conn.execute(
                "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
                params![page.site_id, page.path, page.code, page.content],
            )?;
            page.id = self.conn.last_insert_rowid();
        } else {
            self.conn.execute(
                "UPDATE pages SET site_id = ?1, path = ?2, code = ?3, content = ?4
                 WHERE id = ?5",
                params![page.site_id, page.path, page.code, page.content, page.id],
            )?;
        }
        Ok(())
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        Ok(())
    }

    fn find_page_by_id(&self, id: i64) -> StorageResult<Option<PageRecord>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1");
        let page = self
            .conn
            .query_row(&sql, params![id], Self::map_page)
            .optional()?;
        Ok(page)
    }

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE site_id = ?1 AND path = ?2");
        let page = self
            .conn
            .query_row(&sql, params![site_id, path], Self::map_page)
            .optional()?;
        Ok(page)
    }

    fn pages_by_site(&self, site_id: i64) -> StorageResult<Vec<PageRecord>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE site_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![site_id], Self::map_page)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn count_pages(&self, site_id: i64) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ===== Lemmas =====

    fn save_lemma(&mut self, lemma: &mut LemmaRecord) -> StorageResult<()> {
        if lemma.id == 0 {
            self.conn.execute(
                "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, ?3)",
                params![lemma.site_id, lemma.lemma, lemma.frequency],
            )?;
            lemma.id = self.conn.last_insert_rowid();
        } else {
            self.conn.execute(
                "UPDATE lemmas SET site_id = ?1, lemma = ?2, frequency = ?3 WHERE id = ?4",
                params![lemma.site_id, lemma.lemma, lemma.frequency, lemma.id],
            )?;
        }
        Ok(())
    }

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM lemmas WHERE id = ?1", params![lemma_id])?;
        Ok(())
    }

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let sql = format!("SELECT {LEMMA_COLUMNS} FROM lemmas WHERE site_id = ?1 AND lemma = ?2");
        let record = self
            .conn
            .query_row(&sql, params![site_id, lemma], Self::map_lemma)
            .optional()?;
        Ok(record)
    }

    fn lemmas_by_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>> {
        let sql = format!("SELECT {LEMMA_COLUMNS} FROM lemmas WHERE site_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let lemmas = stmt
            .query_map(params![site_id], Self::map_lemma)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn find_lemmas_in(&self, names: &[String]) -> StorageResult<Vec<LemmaRecord>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT {LEMMA_COLUMNS} FROM lemmas WHERE lemma IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let lemmas = stmt
            .query_map(params_from_iter(names.iter()), Self::map_lemma)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn find_lemmas_in_site(
        &self,
        names: &[String],
        site_url: &str,
    ) -> StorageResult<Vec<LemmaRecord>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT l.id, l.site_id, l.lemma, l.frequency FROM lemmas l
             JOIN sites s ON s.id = l.site_id
             WHERE s.url = ? AND l.lemma IN ({placeholders}) ORDER BY l.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let mut bindings: Vec<&dyn ToSql> = vec![&site_url];
        bindings.extend(names.iter().map(|name| name as &dyn ToSql));

        let lemmas = stmt
            .query_map(bindings.as_slice(), Self::map_lemma)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn count_lemmas(&self, site_id: i64) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn has_lemmas(&self) -> StorageResult<bool> {
        let exists: i64 = self
            .conn
            .query_row("SELECT EXISTS(SELECT 1 FROM lemmas)", [], |row| row.get(0))?;
        Ok(exists != 0)
    }

    // ===== Index rows =====

    fn save_index(&mut self, index: &mut IndexRecord) -> StorageResult<()> {
        if index.id == 0 {
            self.conn.execute(
                "INSERT INTO page_index (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)",
                params![index.page_id, index.lemma_id, index.rank],
            )?;
            index.id = self.conn.last_insert_rowid();
        } else {
            self.conn.execute(
                "UPDATE page_index SET page_id = ?1, lemma_id = ?2, rank = ?3 WHERE id = ?4",
                params![index.page_id, index.lemma_id, index.rank, index.id],
            )?;
        }
        Ok(())
    }

    fn save_indexes(&mut self, indexes: &mut [IndexRecord]) -> StorageResult<()> {
        for index in indexes {
            self.save_index(index)?;
        }
        Ok(())
    }

    fn delete_index(&mut self, index_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM page_index WHERE id = ?1", params![index_id])?;
        Ok(())
    }

    fn find_index_by_id(&self, id: i64) -> StorageResult<Option<IndexRecord>> {
        let sql = format!("SELECT {INDEX_COLUMNS} FROM page_index WHERE id = ?1");
        let index = self
            .conn
            .query_row(&sql, params![id], Self::map_index)
            .optional()?;
        Ok(index)
    }

    fn indexes_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<IndexRecord>> {
        let sql = format!("SELECT {INDEX_COLUMNS} FROM page_index WHERE lemma_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let indexes = stmt
            .query_map(params![lemma_id], Self::map_index)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(indexes)
    }

    fn count_pages_with_lemma(&self, lemma_id: i64) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT page_id) FROM page_index WHERE lemma_id = ?1",
            params![lemma_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::entities;

    fn storage() -> SqliteStorage {
        SqliteStorage::new_in_memory().unwrap()
    }

    fn saved_site(store: &mut SqliteStorage, url: &str) -> SiteRecord {
        let mut site = entities::new_site("Test", url);
        store.save_site(&mut site).unwrap();
        site
    }

    fn saved_page(store: &mut SqliteStorage, site_id: i64, path: &str) -> PageRecord {
        let mut page = entities::new_page(site_id, path, 200, "<html></html>");
        store.save_page(&mut page).unwrap();
        page
    }

    #[test]
    fn test_save_site_assigns_id() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        assert!(site.id > 0);
        assert_eq!(site.status, SiteStatus::Indexing);
    }

    #[test]
    fn test_site_url_unique() {
        let mut store = storage();
        saved_site(&mut store, "https://example.com");
        let mut duplicate = entities::new_site("Copy", "https://example.com");
        assert!(store.save_site(&mut duplicate).is_err());
    }

    #[test]
    fn test_update_site() {
        let mut store = storage();
        let mut site = saved_site(&mut store, "https://example.com");

        site.status = SiteStatus::Failed;
        site.last_error = Some("boom".to_string());
        store.save_site(&mut site).unwrap();

        let loaded = store.find_site_by_id(site.id).unwrap().unwrap();
        assert_eq!(loaded.status, SiteStatus::Failed);
        assert_eq!(loaded.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_find_site_by_url() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");

        let found = store.find_site_by_url("https://example.com").unwrap();
        assert_eq!(found.map(|s| s.id), Some(site.id));
        assert!(store.find_site_by_url("https://other.com").unwrap().is_none());
    }

    #[test]
    fn test_has_sites() {
        let mut store = storage();
        assert!(!store.has_sites().unwrap());
        saved_site(&mut store, "https://example.com");
        assert!(store.has_sites().unwrap());
    }

    #[test]
    fn test_delete_site_by_id() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        let page = saved_page(&mut store, site.id, "/a");

        store.delete_site(site.id).unwrap();

        assert!(store.find_site_by_id(site.id).unwrap().is_none());
        assert!(store.find_page_by_id(page.id).unwrap().is_none());
    }

    #[test]
    fn test_page_unique_within_site() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        saved_page(&mut store, site.id, "/a");

        let mut duplicate = entities::new_page(site.id, "/a", 200, "x");
        assert!(store.save_page(&mut duplicate).is_err());

        // The same path on another site is fine
        let other = saved_site(&mut store, "https://other.com");
        let mut same_path = entities::new_page(other.id, "/a", 200, "x");
        assert!(store.save_page(&mut same_path).is_ok());
    }

    #[test]
    fn test_count_pages() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        assert_eq!(store.count_pages(site.id).unwrap(), 0);
        saved_page(&mut store, site.id, "/a");
        saved_page(&mut store, site.id, "/b");
        assert_eq!(store.count_pages(site.id).unwrap(), 2);
    }

    #[test]
    fn test_delete_site_cascades() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        let page = saved_page(&mut store, site.id, "/a");

        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();
        let mut index = entities::new_index(page.id, lemma.id, 1.0);
        store.save_index(&mut index).unwrap();

        store.delete_site_by_url("https://example.com").unwrap();

        assert!(store.find_page_by_id(page.id).unwrap().is_none());
        assert!(store.find_lemma(site.id, "rust").unwrap().is_none());
        assert!(store.find_index_by_id(index.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_page_cascades_index_rows() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        let page = saved_page(&mut store, site.id, "/a");

        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();
        let mut index = entities::new_index(page.id, lemma.id, 1.0);
        store.save_index(&mut index).unwrap();

        store.delete_page(page.id).unwrap();

        assert!(store.find_index_by_id(index.id).unwrap().is_none());
        // Lemma rows survive page deletion; the decrement path owns them
        assert!(store.find_lemma(site.id, "rust").unwrap().is_some());
    }

    #[test]
    fn test_lemma_unique_per_site() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");

        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();

        let mut duplicate = entities::new_lemma(site.id, "rust", 2);
        assert!(store.save_lemma(&mut duplicate).is_err());
    }

    #[test]
    fn test_find_lemmas_in() {
        let mut store = storage();
        let a = saved_site(&mut store, "https://a.com");
        let b = saved_site(&mut store, "https://b.com");

        for (site_id, name) in [(a.id, "rust"), (a.id, "async"), (b.id, "rust")] {
            let mut lemma = entities::new_lemma(site_id, name, 1);
            store.save_lemma(&mut lemma).unwrap();
        }

        let names = vec!["rust".to_string(), "missing".to_string()];
        let found = store.find_lemmas_in(&names).unwrap();
        assert_eq!(found.len(), 2);

        let scoped = store.find_lemmas_in_site(&names, "https://b.com").unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].site_id, b.id);

        assert!(store.find_lemmas_in(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_index_unique_per_page_lemma() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        let page = saved_page(&mut store, site.id, "/a");
        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();

        let mut index = entities::new_index(page.id, lemma.id, 1.0);
        store.save_index(&mut index).unwrap();

        let mut duplicate = entities::new_index(page.id, lemma.id, 2.0);
        assert!(store.save_index(&mut duplicate).is_err());
    }

    #[test]
    fn test_count_pages_with_lemma() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");
        let page_a = saved_page(&mut store, site.id, "/a");
        let page_b = saved_page(&mut store, site.id, "/b");

        let mut lemma = entities::new_lemma(site.id, "rust", 2);
        store.save_lemma(&mut lemma).unwrap();

        for page_id in [page_a.id, page_b.id] {
            let mut index = entities::new_index(page_id, lemma.id, 1.0);
            store.save_index(&mut index).unwrap();
        }

        assert_eq!(store.count_pages_with_lemma(lemma.id).unwrap(), 2);
        assert_eq!(store.indexes_for_lemma(lemma.id).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_index_and_has_lemmas() {
        let mut store = storage();
        assert!(!store.has_lemmas().unwrap());

        let site = saved_site(&mut store, "https://example.com");
        let page = saved_page(&mut store, site.id, "/a");
        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();
        assert!(store.has_lemmas().unwrap());

        let mut index = entities::new_index(page.id, lemma.id, 1.0);
        store.save_index(&mut index).unwrap();

        store.delete_index(index.id).unwrap();
        assert!(store.find_index_by_id(index.id).unwrap().is_none());
    }

    #[test]
    fn test_transaction_rollback() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");

        store.begin().unwrap();
        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();
        store.rollback().unwrap();

        assert!(store.find_lemma(site.id, "rust").unwrap().is_none());
    }

    #[test]
    fn test_transaction_commit() {
        let mut store = storage();
        let site = saved_site(&mut store, "https://example.com");

        store.begin().unwrap();
        let mut lemma = entities::new_lemma(site.id, "rust", 1);
        store.save_lemma(&mut lemma).unwrap();
        store.commit().unwrap();

        assert!(store.find_lemma(site.id, "rust").unwrap().is_some());
    }
}
