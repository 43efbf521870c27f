//! JSON backup and restore of all stored visits.
//!
//! The payload keeps the key names and labels of the original app's backup
//! files, so those restore here unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db::{DbError, SettingsStore, VisitStore};
use crate::models::VisitRecord;

/// Backup errors.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Input is not JSON at all.
    #[error("Could not read JSON: {0}")]
    Unparsable(#[source] serde_json::Error),

    /// JSON without a `visits` list.
    #[error("Not a visit backup: {0}")]
    Malformed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// Full backup file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    /// RFC 3339 timestamp
    pub exported_at: String,
    pub doctor_name: String,
    pub visits: Vec<VisitRecord>,
}

impl BackupPayload {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Outcome of a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entries written to storage
    pub imported: usize,
    /// Entries that were not visit-shaped
    pub skipped: usize,
}

/// Snapshot every stored visit with the current doctor name.
pub fn create_backup<S>(store: &S) -> BackupResult<BackupPayload>
where
    S: VisitStore + SettingsStore,
{
    let visits = store.list_all()?;
    tracing::info!(visits = visits.len(), "backup created");

    Ok(BackupPayload {
        exported_at: chrono::Utc::now().to_rfc3339(),
        doctor_name: store.doctor_name()?,
        visits,
    })
}

/// Restore a backup into `store`.
///
/// Nothing is written unless the input is JSON with a `visits` list.
/// Entries without a usable `visitDate` (or that are not objects) are
/// skipped, and entries without an ID get a fresh one. The rest are stored
/// as-is in a single write, keeping their `updatedAt`. A storage failure
/// leaves the store as it was before the restore.
pub fn restore_backup<S>(store: &S, bytes: &[u8]) -> BackupResult<RestoreReport>
where
    S: VisitStore,
{
    let payload: Value = serde_json::from_slice(bytes).map_err(BackupError::Unparsable)?;

    let entries = match payload.get("visits") {
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(BackupError::Malformed("`visits` is not a list".into())),
        None => return Err(BackupError::Malformed("missing `visits`".into())),
    };

    let mut visits = Vec::with_capacity(entries.len());
    let mut report = RestoreReport::default();
    for (index, entry) in entries.iter().enumerate() {
        match VisitRecord::deserialize(entry) {
            Ok(visit) => visits.push(visit),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping backup entry");
                report.skipped += 1;
            }
        }
    }

    store.put_all(&visits)?;
    report.imported = visits.len();

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        "backup restored"
    );
    Ok(report)
}
