//! SQLite catalogue backend for persistent storage.

use super::{normalize_tags, CatalogItem, CatalogStats, CatalogStore, NewItem};
use crate::core::fingerprint::{Fingerprint, FingerprintKind};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

/// Raw column values of one `items` row
struct ItemRow {
    id: String,
    name: String,
    description: String,
    photo_url: Option<String>,
    thumbnail: Option<String>,
    fingerprint_kind: String,
    fingerprint: String,
    created_at: String,
}

const ITEM_COLUMNS: &str =
    "id, name, description, photo_url, thumbnail, fingerprint_kind, fingerprint, created_at";

/// SQLite-backed persistent catalogue
///
/// Uses WAL (Write-Ahead Logging) mode so readers are not blocked by writes.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCatalog {
    /// Open or create a catalogue database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Self::create_schema(&conn)?;
        info!(path = %path.display(), "opened catalogue database");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;
        Self::create_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn create_schema(conn: &Connection) -> Result<(), StoreError> {
        // tags.key is the Unicode-lowercased name; SQLite only folds ASCII.
        // fingerprint_bits holds the signed pattern of 64-bit dHashes for
        // BIGINT-style lookups; other fingerprints leave it NULL
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                photo_url TEXT,
                thumbnail TEXT,
                fingerprint_kind TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                fingerprint_bits INTEGER,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                key TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS item_tags (
                item_id TEXT NOT NULL,
                tag_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (item_id, tag_id)
            );
            CREATE INDEX IF NOT EXISTS idx_item_tags_item ON item_tags(item_id);",
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn query_err(e: rusqlite::Error) -> StoreError {
        StoreError::QueryFailed(e.to_string())
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRow> {
        Ok(ItemRow {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            photo_url: row.get(3)?,
            thumbnail: row.get(4)?,
            fingerprint_kind: row.get(5)?,
            fingerprint: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    /// Turn raw columns into an item, attaching its tags
    fn hydrate(conn: &Connection, row: ItemRow) -> Result<CatalogItem, StoreError> {
        let bad_fingerprint = |source| StoreError::BadFingerprint {
            id: row.id.clone(),
            source,
        };

        let kind: FingerprintKind = row.fingerprint_kind.parse().map_err(bad_fingerprint)?;
        let fingerprint = Fingerprint::decode(kind, &row.fingerprint).map_err(bad_fingerprint)?;

        let id = Uuid::parse_str(&row.id)
            .map_err(|e| StoreError::InvalidItem(format!("bad id {}: {}", row.id, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| StoreError::InvalidItem(format!("bad timestamp for {}: {}", row.id, e)))?
            .with_timezone(&Utc);

        let tags = Self::tags_for(conn, &row.id)?;

        Ok(CatalogItem {
            id,
            name: row.name,
            description: row.description,
            photo_url: row.photo_url,
            thumbnail: row.thumbnail,
            tags,
            fingerprint,
            created_at,
        })
    }

    fn tags_for(conn: &Connection, item_id: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = conn
            .prepare(
                "SELECT t.name FROM item_tags it
                 JOIN tags t ON t.id = it.tag_id
                 WHERE it.item_id = ?
                 ORDER BY it.position",
            )
            .map_err(Self::query_err)?;

        let tags = stmt
            .query_map([item_id], |row| row.get::<_, String>(0))
            .map_err(Self::query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::query_err)?;
        Ok(tags)
    }

    /// Find a tag by name (ignoring case), creating it if needed
    fn tag_id(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
        let key = name.to_lowercase();
        let existing: Option<i64> = tx
            .query_row("SELECT id FROM tags WHERE key = ?", [&key], |row| row.get(0))
            .optional()
            .map_err(Self::query_err)?;

        if let Some(id) = existing {
            return Ok(id);
        }

        tx.execute("INSERT INTO tags (name, key) VALUES (?, ?)", [name, key.as_str()])
            .map_err(Self::query_err)?;
        Ok(tx.last_insert_rowid())
    }

    fn write_tags(tx: &Transaction<'_>, item_id: &str, tags: &[String]) -> Result<(), StoreError> {
        tx.execute("DELETE FROM item_tags WHERE item_id = ?", [item_id])
            .map_err(Self::query_err)?;

        for (position, tag) in tags.iter().enumerate() {
            let tag_id = Self::tag_id(tx, tag)?;
            tx.execute(
                "INSERT INTO item_tags (item_id, tag_id, position) VALUES (?, ?, ?)",
                params![item_id, tag_id, position as i64],
            )
            .map_err(Self::query_err)?;
        }
        Ok(())
    }

    fn insert(tx: &Transaction<'_>, item: &CatalogItem) -> Result<(), StoreError> {
        let id = item.id.to_string();
        let fingerprint_bits = match &item.fingerprint {
            Fingerprint::DHash(bits) => bits.as_i64(),
            Fingerprint::HsvMean(_) => None,
        };

        tx.execute(
            "INSERT INTO items
             (id, name, description, photo_url, thumbnail,
              fingerprint_kind, fingerprint, fingerprint_bits, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                item.name,
                item.description,
                item.photo_url,
                item.thumbnail,
                item.fingerprint.kind().as_str(),
                item.fingerprint.encode(),
                fingerprint_bits,
                item.created_at.to_rfc3339(),
            ],
        )
        .map_err(Self::query_err)?;

        Self::write_tags(tx, &id, &item.tags)
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<CatalogItem>, StoreError> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS),
                [id],
                Self::read_row,
            )
            .optional()
            .map_err(Self::query_err)?;

        row.map(|row| Self::hydrate(conn, row)).transpose()
    }

    /// Items whose 64-bit dHash has exactly this signed bit pattern
    pub fn find_by_hash_bits(&self, bits: i64) -> Result<Vec<CatalogItem>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM items WHERE fingerprint_bits = ? ORDER BY rowid",
                ITEM_COLUMNS
            ))
            .map_err(Self::query_err)?;

        let rows = stmt
            .query_map([bits], Self::read_row)
            .map_err(Self::query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::query_err)?;

        rows.into_iter()
            .map(|row| Self::hydrate(&conn, row))
            .collect()
    }
}

impl CatalogStore for SqliteCatalog {
    fn add(&self, item: NewItem) -> Result<CatalogItem, StoreError> {
        let mut added = self.add_batch(vec![item])?;
        added
            .pop()
            .ok_or_else(|| StoreError::QueryFailed("item was not stored".to_string()))
    }

    fn add_batch(&self, items: Vec<NewItem>) -> Result<Vec<CatalogItem>, StoreError> {
        let items = items
            .into_iter()
            .map(NewItem::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(Self::query_err)?;
        for item in &items {
            Self::insert(&tx, item)?;
        }
        tx.commit().map_err(Self::query_err)?;

        Ok(items)
    }

    fn get(&self, id: Uuid) -> Result<Option<CatalogItem>, StoreError> {
        let conn = self.lock()?;
        Self::fetch(&conn, &id.to_string())
    }

    fn list(&self) -> Result<Vec<CatalogItem>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM items ORDER BY rowid", ITEM_COLUMNS))
            .map_err(Self::query_err)?;

        let rows = stmt
            .query_map([], Self::read_row)
            .map_err(Self::query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::query_err)?;

        rows.into_iter()
            .map(|row| Self::hydrate(&conn, row))
            .collect()
    }

    fn update_tags(&self, id: Uuid, tags: &[String]) -> Result<CatalogItem, StoreError> {
        let tags = normalize_tags(tags);
        let id = id.to_string();

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(Self::query_err)?;

        let exists: Option<String> = tx
            .query_row("SELECT id FROM items WHERE id = ?", [&id], |row| row.get(0))
            .optional()
            .map_err(Self::query_err)?;
        if exists.is_none() {
            return Err(StoreError::ItemNotFound { id });
        }

        Self::write_tags(&tx, &id, &tags)?;
        tx.commit().map_err(Self::query_err)?;

        Self::fetch(&conn, &id)?.ok_or(StoreError::ItemNotFound { id })
    }

    fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let id = id.to_string();
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(Self::query_err)?;

        let removed = tx
            .execute("DELETE FROM items WHERE id = ?", [&id])
            .map_err(Self::query_err)?;
        if removed == 0 {
            return Err(StoreError::ItemNotFound { id });
        }

        tx.execute("DELETE FROM item_tags WHERE item_id = ?", [&id])
            .map_err(Self::query_err)?;
        tx.commit().map_err(Self::query_err)
    }

    fn search_text(&self, query: &str) -> Result<Vec<CatalogItem>, StoreError> {
        let query = query.trim();
        if !query.is_ascii() {
            // LIKE folds ASCII only; match the in-memory rules instead
            return Ok(self
                .list()?
                .into_iter()
                .filter(|item| item.matches_text(query))
                .collect());
        }

        let pattern = format!("%{}%", escape_like(query));
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM items i
                 WHERE i.name LIKE ?1 ESCAPE '\\'
                    OR i.description LIKE ?1 ESCAPE '\\'
                    OR EXISTS (
                        SELECT 1 FROM item_tags it JOIN tags t ON t.id = it.tag_id
                        WHERE it.item_id = i.id AND t.key LIKE ?1 ESCAPE '\\'
                    )
                 ORDER BY i.rowid",
                ITEM_COLUMNS
            ))
            .map_err(Self::query_err)?;

        let rows = stmt
            .query_map([&pattern], Self::read_row)
            .map_err(Self::query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::query_err)?;

        rows.into_iter()
            .map(|row| Self::hydrate(&conn, row))
            .collect()
    }

    fn tags_matching(&self, query: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM tags WHERE key LIKE ? ESCAPE '\\'
                 ORDER BY key LIMIT ?",
            )
            .map_err(Self::query_err)?;

        let tags = stmt
            .query_map(params![pattern, limit as i64], |row| row.get::<_, String>(0))
            .map_err(Self::query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::query_err)?;
        Ok(tags)
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        let conn = self.lock()?;

        let item_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .map_err(Self::query_err)?;
        let tag_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .map_err(Self::query_err)?;

        Ok(CatalogStats {
            item_count: item_count as usize,
            tag_count: tag_count as usize,
        })
    }
}

/// Escape LIKE wildcards so user text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
