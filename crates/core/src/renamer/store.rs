//! Mapping table storage.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::types::{Mapping, MappingError};

/// Metadata key for the md5 of the last parsed spreadsheet.
pub const META_FILE_HASH: &str = "file_hash";
/// Metadata key for the RFC 3339 time of the last table replacement.
pub const META_LAST_UPDATED: &str = "last_updated";

/// Storage for the code → new name table.
pub trait MappingStore: Send + Sync {
    /// Replace the whole table. Returns the new row count.
    fn replace_all(&self, mappings: &[(String, String)]) -> Result<usize, MappingError>;

    fn get(&self, code: &str) -> Result<Option<String>, MappingError>;

    /// All mappings ordered by code.
    fn list(&self) -> Result<Vec<Mapping>, MappingError>;

    fn count(&self) -> Result<usize, MappingError>;

    fn meta(&self, key: &str) -> Result<Option<String>, MappingError>;

    fn set_meta(&self, key: &str, value: &str) -> Result<(), MappingError>;

    fn delete_meta(&self, key: &str) -> Result<(), MappingError>;
}

fn db_err(e: rusqlite::Error) -> MappingError {
    MappingError::Database(e.to_string())
}

/// SQLite-backed mapping store.
pub struct SqliteMappingStore {
    conn: Mutex<Connection>,
}

impl SqliteMappingStore {
    /// Open (or create) the database at `path`.
    pub fn new(path: &Path) -> Result<Self, MappingError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, MappingError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), MappingError> {
        conn.execute_batch(
            r#"
            -- Code to renamed-file mapping, replaced wholesale on refresh
            CREATE TABLE IF NOT EXISTS rename_mappings (
                code TEXT PRIMARY KEY,
                new_name TEXT NOT NULL
            );

            -- Refresh bookkeeping (spreadsheet hash, last update)
            CREATE TABLE IF NOT EXISTS rename_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, MappingError> {
        self.conn
            .lock()
            .map_err(|_| MappingError::Database("connection lock poisoned".to_string()))
    }
}

impl MappingStore for SqliteMappingStore {
    fn replace_all(&self, mappings: &[(String, String)]) -> Result<usize, MappingError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM rename_mappings", [])
            .map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare("INSERT OR REPLACE INTO rename_mappings (code, new_name) VALUES (?1, ?2)")
                .map_err(db_err)?;
            for (code, new_name) in mappings {
                stmt.execute(params![code, new_name]).map_err(db_err)?;
            }
        }
        let count: i64 = tx
            .query_row("SELECT COUNT(*) FROM rename_mappings", [], |row| row.get(0))
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(count as usize)
    }

    fn get(&self, code: &str) -> Result<Option<String>, MappingError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT new_name FROM rename_mappings WHERE code = ?",
            params![code],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn list(&self) -> Result<Vec<Mapping>, MappingError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT code, new_name FROM rename_mappings ORDER BY code")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Mapping {
                    code: row.get(0)?,
                    new_name: row.get(1)?,
                })
            })
            .map_err(db_err)?;

        let mut mappings = Vec::new();
        for row in rows {
            mappings.push(row.map_err(db_err)?);
        }
        Ok(mappings)
    }

    fn count(&self) -> Result<usize, MappingError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM rename_mappings", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }

    fn meta(&self, key: &str) -> Result<Option<String>, MappingError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM rename_meta WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<(), MappingError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO rename_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn delete_meta(&self, key: &str) -> Result<(), MappingError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM rename_meta WHERE key = ?", params![key])
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pairs(rows: &[(&str, &str)]) -> Vec<(String, String)> {
        rows.iter()
            .map(|(c, n)| (c.to_string(), n.to_string()))
            .collect()
    }

    #[test]
    fn test_replace_all_and_lookup() {
        let store = SqliteMappingStore::in_memory().unwrap();
        let count = store
            .replace_all(&pairs(&[("24369", "tazza"), ("117", "piatto")]))
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.get("24369").unwrap().as_deref(), Some("tazza"));
        assert_eq!(store.get("999").unwrap(), None);
        assert_eq!(
            store.list().unwrap(),
            vec![
                Mapping {
                    code: "117".to_string(),
                    new_name: "piatto".to_string()
                },
                Mapping {
                    code: "24369".to_string(),
                    new_name: "tazza".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_replace_all_drops_old_rows() {
        let store = SqliteMappingStore::in_memory().unwrap();
        store.replace_all(&pairs(&[("1", "a"), ("2", "b")])).unwrap();
        store.replace_all(&pairs(&[("3", "c")])).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get("1").unwrap(), None);
    }

    #[test]
    fn test_meta_roundtrip() {
        let store = SqliteMappingStore::in_memory().unwrap();
        assert_eq!(store.meta(META_FILE_HASH).unwrap(), None);

        store.set_meta(META_FILE_HASH, "abc").unwrap();
        store.set_meta(META_FILE_HASH, "def").unwrap();
        assert_eq!(store.meta(META_FILE_HASH).unwrap().as_deref(), Some("def"));

        store.delete_meta(META_FILE_HASH).unwrap();
        assert_eq!(store.meta(META_FILE_HASH).unwrap(), None);
    }

    #[test]
    fn test_persists_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mappings.db");

        {
            let store = SqliteMappingStore::new(&path).unwrap();
            store.replace_all(&pairs(&[("24369", "tazza")])).unwrap();
        }

        let reopened = SqliteMappingStore::new(&path).unwrap();
        assert_eq!(reopened.get("24369").unwrap().as_deref(), Some("tazza"));
    }
}
