//! OPD Logger Core Library
//!
//! Offline outpatient visit logging for field clinics: one record per visit,
//! grouped by visit date, with day summaries and exports.
//!
//! # Architecture
//!
//! ```text
//!   Visit form (draft) ── validate ──► VisitRecord ──► VisitStore (SQLite)
//!                                                           │
//!                                              get_by_date(visit_date)
//!                                                           │
//!                                   ┌───────────────────────┼──────────────────┐
//!                                   ▼                       ▼                  ▼
//!                               summarize              project_raw          list_all
//!                                   │                       │                  │
//!                                   ▼                       ▼                  ▼
//!                               DaySummary ──► SummarySections      Backup JSON
//!                                   │                       │              ▲
//!                                   └───────► DayExport ◄───┘              │
//!                                            (CSV / JSON)           restore_backup
//! ```
//!
//! # Core Principle
//!
//! **Counts are always derived.** A day summary is recomputed from stored
//! visits on demand and covers every category, even those with zero visits.
//!
//! # Modules
//!
//! - [`models`]: Diagnosis catalog, visit records, drafts and validation
//! - [`summary`]: Day summary aggregation
//! - [`db`]: SQLite storage for visits and settings
//! - [`export`]: Day exports, backup and restore
//! - [`config`]: Startup configuration and export file names

pub mod config;
pub mod db;
pub mod export;
pub mod models;
pub mod summary;

// Re-export commonly used types
pub use config::CoreConfig;
pub use db::{Database, SettingsStore, VisitStore};
pub use export::{create_backup, restore_backup, DayExport, DayExporter, RestoreReport};
pub use models::{
    AgeGroup, Category, DiagnosisCode, Disposition, Gender, ValidationError, VisitDraft,
    VisitRecord, WwStatus,
};
pub use summary::{summarize, DaySummary};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum OpdLoggerError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Carries the user-facing validation message.
    #[error("{0}")]
    ValidationFailed(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Restore failed: {0}")]
    RestoreFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for OpdLoggerError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => OpdLoggerError::NotFound(what),
            other => OpdLoggerError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ValidationError> for OpdLoggerError {
    fn from(e: ValidationError) -> Self {
        OpdLoggerError::ValidationFailed(e.to_string())
    }
}

impl From<export::ExportError> for OpdLoggerError {
    fn from(e: export::ExportError) -> Self {
        match e {
            export::ExportError::Storage(db) => db.into(),
            other => OpdLoggerError::ExportFailed(other.to_string()),
        }
    }
}

impl From<export::BackupError> for OpdLoggerError {
    fn from(e: export::BackupError) -> Self {
        match e {
            export::BackupError::Storage(db) => db.into(),
            other => OpdLoggerError::RestoreFailed(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for OpdLoggerError {
    fn from(e: config::ConfigError) -> Self {
        OpdLoggerError::InvalidInput(e.to_string())
    }
}

impl From<models::UnknownLabel> for OpdLoggerError {
    fn from(e: models::UnknownLabel) -> Self {
        OpdLoggerError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for OpdLoggerError {
    fn from(e: serde_json::Error) -> Self {
        OpdLoggerError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for OpdLoggerError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        OpdLoggerError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
///
/// Exports are named for the directory holding the database.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<OpdLoggerCore>, OpdLoggerError> {
    let database_path = PathBuf::from(&path);
    let export_dir = database_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    open_with(CoreConfig::new(database_path, export_dir)?)
}

/// Open or create a database with an explicit export directory and,
/// optionally, a file name prefix other than `OPD_LoggerX`.
#[uniffi::export]
pub fn open_database_with_config(
    path: String,
    export_dir: String,
    app_name: Option<String>,
) -> Result<Arc<OpdLoggerCore>, OpdLoggerError> {
    let mut config = CoreConfig::new(PathBuf::from(path), PathBuf::from(export_dir))?;
    if let Some(app_name) = app_name {
        config = config.with_app_name(&app_name)?;
    }
    open_with(config)
}

fn open_with(config: CoreConfig) -> Result<Arc<OpdLoggerCore>, OpdLoggerError> {
    let db = Database::open(config.database_path())?;
    tracing::info!(
        path = %config.database_path().display(),
        export_dir = %config.export_dir().display(),
        "database opened"
    );
    Ok(Arc::new(OpdLoggerCore::new(db, config)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<OpdLoggerCore>, OpdLoggerError> {
    let config = CoreConfig::new(PathBuf::from(":memory:"), PathBuf::new())?;
    let db = Database::open_in_memory()?;
    Ok(Arc::new(OpdLoggerCore::new(db, config)))
}

/// A blank visit form: current time, disposition Discharged.
#[uniffi::export]
pub fn new_visit_draft() -> FfiVisitDraft {
    VisitDraft::new().into()
}

/// Toggle a diagnosis in a selection of at most two codes.
#[uniffi::export]
pub fn toggle_diagnosis(selected: Vec<u32>, code: u32) -> Vec<u32> {
    models::toggle_diagnosis(&selected, code)
}

/// The full diagnosis catalog in code order.
#[uniffi::export]
pub fn diagnosis_catalog() -> Vec<FfiDiagnosis> {
    models::all_diagnoses().iter().map(FfiDiagnosis::from).collect()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(Debug, uniffi::Object)]
pub struct OpdLoggerCore {
    db: Arc<Mutex<Database>>,
    config: CoreConfig,
}

impl OpdLoggerCore {
    fn new(db: Database, config: CoreConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config,
        }
    }
}

#[uniffi::export]
impl OpdLoggerCore {
    // =========================================================================
    // Settings
    // =========================================================================

    /// The doctor's display name, empty if unset.
    pub fn get_doctor_name(&self) -> Result<String, OpdLoggerError> {
        let db = self.db.lock()?;
        Ok(db.doctor_name()?)
    }

    pub fn set_doctor_name(&self, name: String) -> Result<(), OpdLoggerError> {
        let db = self.db.lock()?;
        db.set_doctor_name(&name)?;
        Ok(())
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Validate a draft and store it under `visit_date` (`YYYY-MM-DD`).
    ///
    /// A draft with an `id` replaces the stored record with that ID. A
    /// stored visit keeps its date: saving it under another date fails.
    pub fn save_visit(
        &self,
        draft: FfiVisitDraft,
        visit_date: String,
    ) -> Result<FfiVisitRecord, OpdLoggerError> {
        let visit_date = parse_visit_date(&visit_date)?;
        let draft = VisitDraft::try_from(draft)?;

        let db = self.db.lock()?;
        if let Some(id) = draft.id.as_deref() {
            if let Some(stored) = db.get_visit(id)? {
                if stored.visit_date != visit_date {
                    return Err(OpdLoggerError::InvalidInput(format!(
                        "visit {} belongs to {}, not {}",
                        id, stored.visit_date, visit_date
                    )));
                }
            }
        }

        let mut record = draft.into_record(visit_date)?;
        db.save(&mut record)?;
        Ok(record.into())
    }

    /// Get a visit by ID.
    pub fn get_visit(&self, id: String) -> Result<Option<FfiVisitRecord>, OpdLoggerError> {
        let db = self.db.lock()?;
        let visit = db.get_visit(&id)?;
        Ok(visit.map(|v| v.into()))
    }

    /// Load a stored visit into a draft for editing.
    pub fn edit_visit(&self, id: String) -> Result<FfiVisitDraft, OpdLoggerError> {
        let db = self.db.lock()?;
        let visit = db.require_visit(&id)?;
        Ok(VisitDraft::from_record(&visit).into())
    }

    /// Visits of one day, ordered by time.
    pub fn visits_for_date(
        &self,
        visit_date: String,
    ) -> Result<Vec<FfiVisitRecord>, OpdLoggerError> {
        let visit_date = parse_visit_date(&visit_date)?;
        let db = self.db.lock()?;
        let visits = db.get_by_date(visit_date)?;
        Ok(visits.into_iter().map(|v| v.into()).collect())
    }

    /// Dates with at least one visit, newest first.
    pub fn list_visit_dates(&self) -> Result<Vec<String>, OpdLoggerError> {
        let db = self.db.lock()?;
        let dates = db.list_distinct_dates()?;
        Ok(dates.into_iter().map(|d| d.to_string()).collect())
    }

    /// Delete a visit. Returns false if it did not exist.
    pub fn delete_visit(&self, id: String) -> Result<bool, OpdLoggerError> {
        let db = self.db.lock()?;
        Ok(db.delete_by_id(&id)?)
    }

    // =========================================================================
    // Summary & Export Operations
    // =========================================================================

    /// Day summary as JSON.
    pub fn day_summary_json(&self, visit_date: String) -> Result<String, OpdLoggerError> {
        let visit_date = parse_visit_date(&visit_date)?;
        let db = self.db.lock()?;
        let visits = db.get_by_date(visit_date)?;
        Ok(serde_json::to_string_pretty(&summarize(&visits))?)
    }

    /// Day export (raw rows and summary blocks) as JSON.
    pub fn export_day_json(&self, visit_date: String) -> Result<String, OpdLoggerError> {
        let export = self.export_day(&visit_date)?;
        Ok(export.to_json()?)
    }

    /// Raw data sheet as CSV.
    pub fn export_day_raw_csv(&self, visit_date: String) -> Result<String, OpdLoggerError> {
        Ok(self.export_day(&visit_date)?.raw_csv())
    }

    /// Day summary sheet as CSV.
    pub fn export_day_summary_csv(&self, visit_date: String) -> Result<String, OpdLoggerError> {
        Ok(self.export_day(&visit_date)?.summary_csv(&self.config))
    }

    /// Suggested file path for a day export.
    pub fn day_export_path(&self, visit_date: String) -> Result<String, OpdLoggerError> {
        let visit_date = parse_visit_date(&visit_date)?;
        let db = self.db.lock()?;
        let doctor_name = db.doctor_name()?;
        let path = self.config.day_export_path(visit_date, &doctor_name);
        Ok(path.to_string_lossy().into_owned())
    }

    // =========================================================================
    // Backup Operations
    // =========================================================================

    /// Every stored visit as a backup JSON document.
    pub fn backup_json(&self) -> Result<String, OpdLoggerError> {
        let db = self.db.lock()?;
        let backup = create_backup(&*db)?;
        Ok(backup.to_json()?)
    }

    /// Suggested file path for a backup taken today.
    pub fn backup_path(&self) -> String {
        let today = chrono::Local::now().date_naive();
        self.config.backup_path(today).to_string_lossy().into_owned()
    }

    /// Import a backup document. Existing visits with the same ID are replaced.
    pub fn restore_backup(&self, json: String) -> Result<FfiRestoreReport, OpdLoggerError> {
        let db = self.db.lock()?;
        let report = restore_backup(&*db, json.as_bytes())?;
        Ok(report.into())
    }
}

impl OpdLoggerCore {
    fn export_day(&self, visit_date: &str) -> Result<DayExport, OpdLoggerError> {
        let visit_date = parse_visit_date(visit_date)?;
        let db = self.db.lock()?;
        let exporter = DayExporter::new(&*db);
        Ok(exporter.export_day(visit_date)?)
    }
}

fn parse_visit_date(s: &str) -> Result<NaiveDate, OpdLoggerError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| OpdLoggerError::InvalidInput(format!("visit date {:?}: {}", s, e)))
}

/// Empty strings mean "not selected".
fn parse_optional_label<T>(value: Option<String>) -> Result<Option<T>, OpdLoggerError>
where
    T: std::str::FromStr<Err = models::UnknownLabel>,
{
    match value {
        Some(s) if !s.trim().is_empty() => Ok(Some(s.parse()?)),
        _ => Ok(None),
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe diagnosis catalog entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiagnosis {
    pub code: u32,
    pub name: String,
    /// "M" or "S"
    pub category: String,
    pub short_label: String,
}

impl From<&DiagnosisCode> for FfiDiagnosis {
    fn from(dx: &DiagnosisCode) -> Self {
        Self {
            code: dx.code,
            name: dx.name.to_string(),
            category: dx.category.letter().to_string(),
            short_label: dx.short_label.to_string(),
        }
    }
}

/// FFI-safe visit form. Enum fields carry display labels.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitDraft {
    pub id: Option<String>,
    pub time: String,
    pub patient_id: String,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub diagnoses: Vec<u32>,
    pub disposition: Option<String>,
    pub ww_status: Option<String>,
    pub is_surgical: bool,
}

impl From<VisitDraft> for FfiVisitDraft {
    fn from(draft: VisitDraft) -> Self {
        Self {
            id: draft.id.clone(),
            time: draft.time.clone(),
            patient_id: draft.patient_id.clone(),
            gender: draft.gender.map(|g| g.to_string()),
            age_group: draft.age_group.map(|a| a.to_string()),
            diagnoses: draft.diagnoses().to_vec(),
            disposition: draft.disposition.map(|d| d.to_string()),
            ww_status: draft.ww_status().map(|w| w.to_string()),
            is_surgical: draft.is_surgical(),
        }
    }
}

impl TryFrom<FfiVisitDraft> for VisitDraft {
    type Error = OpdLoggerError;

    /// `is_surgical` is ignored and re-derived from the diagnoses.
    fn try_from(ffi: FfiVisitDraft) -> Result<Self, Self::Error> {
        let mut draft = VisitDraft::new();
        draft.id = ffi.id.filter(|id| !id.trim().is_empty());
        draft.time = ffi.time;
        draft.patient_id = ffi.patient_id;
        draft.gender = parse_optional_label(ffi.gender)?;
        draft.age_group = parse_optional_label(ffi.age_group)?;
        draft.disposition = parse_optional_label(ffi.disposition)?;
        draft.set_diagnoses(ffi.diagnoses);
        draft.set_ww_status(parse_optional_label(ffi.ww_status)?);
        Ok(draft)
    }
}

/// FFI-safe stored visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitRecord {
    pub id: String,
    /// `YYYY-MM-DD`
    pub visit_date: String,
    pub time: String,
    pub patient_id: String,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub diagnoses: Vec<u32>,
    pub disposition: Option<String>,
    pub ww_status: Option<String>,
    pub is_surgical: bool,
    /// "M" or "S"
    pub category: String,
    pub updated_at: i64,
}

impl From<VisitRecord> for FfiVisitRecord {
    fn from(visit: VisitRecord) -> Self {
        Self {
            visit_date: visit.visit_date.to_string(),
            gender: visit.gender.map(|g| g.to_string()),
            age_group: visit.age_group.map(|a| a.to_string()),
            diagnoses: visit.diagnoses().to_vec(),
            disposition: visit.disposition.map(|d| d.to_string()),
            ww_status: visit.ww_status().map(|w| w.to_string()),
            is_surgical: visit.is_surgical(),
            category: visit.category().letter().to_string(),
            updated_at: visit.updated_at,
            id: visit.id,
            time: visit.time,
            patient_id: visit.patient_id,
        }
    }
}

/// FFI-safe restore outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRestoreReport {
    pub imported: u32,
    pub skipped: u32,
}

impl From<RestoreReport> for FfiRestoreReport {
    fn from(report: RestoreReport) -> Self {
        Self {
            imported: report.imported as u32,
            skipped: report.skipped as u32,
        }
    }
}
