//! Settings database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult, SettingsStore};

/// Settings key holding the doctor's display name.
pub const DOCTOR_NAME_KEY: &str = "doctorName";

impl SettingsStore for Database {
    fn get_setting(&self, key: &str, default: &str) -> DbResult<String> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    fn set_setting(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        tracing::debug!(key, "setting stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_unset() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("missing", "fallback").unwrap(), "fallback");
        assert_eq!(db.doctor_name().unwrap(), "");
    }

    #[test]
    fn test_set_and_overwrite() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("theme", "dark").unwrap();
        db.set_setting("theme", "light").unwrap();
        assert_eq!(db.get_setting("theme", "").unwrap(), "light");
    }

    #[test]
    fn test_doctor_name_trimmed() {
        let db = Database::open_in_memory().unwrap();
        db.set_doctor_name("  Dr. Haddad ").unwrap();
        assert_eq!(db.doctor_name().unwrap(), "Dr. Haddad");
        assert_eq!(db.get_setting(DOCTOR_NAME_KEY, "").unwrap(), "Dr. Haddad");
    }
}
