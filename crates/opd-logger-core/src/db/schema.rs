//! SQLite schema definition.

/// Complete database schema for the visit logger.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Visits (one row per outpatient visit, replaced in place on edit)
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id TEXT PRIMARY KEY,
    visit_date TEXT NOT NULL,                    -- YYYY-MM-DD
    time TEXT NOT NULL DEFAULT '',               -- HH:MM
    patient_id TEXT NOT NULL DEFAULT '',
    gender TEXT,                                 -- display label, NULL if unknown
    age_group TEXT,
    diagnoses TEXT NOT NULL DEFAULT '[]',        -- JSON array of catalog codes
    disposition TEXT,
    ww_status TEXT,                              -- surgical visits only
    is_surgical INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0        -- epoch milliseconds
);

CREATE INDEX IF NOT EXISTS idx_visits_date ON visits(visit_date);
CREATE INDEX IF NOT EXISTS idx_visits_date_time ON visits(visit_date, time);

-- ============================================================================
-- Settings
-- ============================================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_visit_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO visits (id, visit_date) VALUES ('v1', '2024-01-01')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO visits (id, visit_date) VALUES ('v1', '2024-01-02')",
            [],
        );
        assert!(result.is_err());
    }
}
