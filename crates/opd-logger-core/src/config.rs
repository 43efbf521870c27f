//! Core runtime configuration.
//!
//! Resolved once at startup and passed into the core; nothing in here reads
//! environment variables.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix used in exported file names.
pub const DEFAULT_APP_NAME: &str = "OPD_LoggerX";

/// Used in file names when the doctor name has no usable characters.
const FALLBACK_DOCTOR: &str = "Doctor";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
    export_dir: PathBuf,
    app_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(database_path: PathBuf, export_dir: PathBuf) -> Result<Self, ConfigError> {
        if database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path cannot be empty".into(),
            ));
        }

        Ok(Self {
            database_path,
            export_dir,
            app_name: DEFAULT_APP_NAME.to_string(),
        })
    }

    /// Override the file name prefix.
    pub fn with_app_name(mut self, app_name: &str) -> Result<Self, ConfigError> {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return Err(ConfigError::Invalid("app_name cannot be empty".into()));
        }
        self.app_name = app_name.to_string();
        Ok(self)
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// `{app}_{date}_{doctor}` with the doctor name made file-safe.
    pub fn day_export_stem(&self, visit_date: NaiveDate, doctor_name: &str) -> String {
        format!("{}_{}_{}", self.app_name, visit_date, safe_name(doctor_name))
    }

    /// Full path for a day export CSV.
    pub fn day_export_path(&self, visit_date: NaiveDate, doctor_name: &str) -> PathBuf {
        self.export_dir
            .join(format!("{}.csv", self.day_export_stem(visit_date, doctor_name)))
    }

    /// `{app}_Backup_{date}.json`
    pub fn backup_filename(&self, date: NaiveDate) -> String {
        format!("{}_Backup_{}.json", self.app_name, date)
    }

    pub fn backup_path(&self, date: NaiveDate) -> PathBuf {
        self.export_dir.join(self.backup_filename(date))
    }
}

/// Keep `[A-Za-z0-9 _-]`, then join whitespace runs with `_`.
fn safe_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");

    if joined.is_empty() {
        FALLBACK_DOCTOR.to_string()
    } else {
        joined
    }
}
