//! Database layer for the visit logger.
//!
//! [`Database`] is the local store for visits and settings. The rest of the
//! crate depends on it only through the [`VisitStore`] and
//! [`SettingsStore`] traits.

mod schema;
mod settings;
mod visits;

pub use schema::*;
pub use settings::*;

use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::VisitRecord;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Persistent store of visit records, partitioned by visit date.
pub trait VisitStore {
    /// Insert or replace a record exactly as given.
    fn put(&self, visit: &VisitRecord) -> DbResult<()>;

    /// Stamp `updated_at` with the current time, then insert or replace.
    fn save(&self, visit: &mut VisitRecord) -> DbResult<()> {
        visit.updated_at = crate::models::current_epoch_millis();
        self.put(visit)
    }

    /// Insert or replace every record as given, all or nothing.
    fn put_all(&self, visits: &[VisitRecord]) -> DbResult<()>;

    /// Every record saved with this visit date, ordered by time.
    fn get_by_date(&self, date: NaiveDate) -> DbResult<Vec<VisitRecord>>;

    /// Distinct visit dates, newest first.
    fn list_distinct_dates(&self) -> DbResult<Vec<NaiveDate>>;

    /// Remove a record. Returns false when no record had this ID.
    fn delete_by_id(&self, id: &str) -> DbResult<bool>;

    /// Every stored record (for backups).
    fn list_all(&self) -> DbResult<Vec<VisitRecord>>;
}

/// Key/value settings.
pub trait SettingsStore {
    /// Value for `key`, or `default` if never set.
    fn get_setting(&self, key: &str, default: &str) -> DbResult<String>;

    fn set_setting(&self, key: &str, value: &str) -> DbResult<()>;

    /// The doctor's display name, empty if unset.
    fn doctor_name(&self) -> DbResult<String> {
        self.get_setting(DOCTOR_NAME_KEY, "")
    }

    /// Store the doctor's display name (trimmed).
    fn set_doctor_name(&self, name: &str) -> DbResult<()> {
        self.set_setting(DOCTOR_NAME_KEY, name.trim())
    }
}

/// Database connection wrapper.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"visits".to_string()));
        assert!(tables.contains(&"settings".to_string()));
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.db");

        {
            let db = Database::open(&path).unwrap();
            db.set_doctor_name("Dr. Amal").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.doctor_name().unwrap(), "Dr. Amal");
    }
}
