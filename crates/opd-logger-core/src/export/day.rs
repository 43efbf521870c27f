//! Day export: raw data and summary for one visit date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::projection::{project_raw, project_summary, RawRow, SummarySections, RAW_HEADERS};
use crate::config::CoreConfig;
use crate::db::{DbError, SettingsStore, VisitStore};
use crate::models::VisitRecord;
use crate::summary::summarize;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Please set the doctor name before exporting.")]
    DoctorNameRequired,

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Everything exported for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayExport {
    pub doctor_name: String,
    pub visit_date: NaiveDate,
    pub exported_at: String,
    pub raw_rows: Vec<RawRow>,
    pub summary: SummarySections,
}

impl DayExport {
    /// Build an export from a day's visits. Requires a doctor name.
    pub fn build(
        visit_date: NaiveDate,
        doctor_name: &str,
        visits: &[VisitRecord],
    ) -> ExportResult<Self> {
        let doctor_name = doctor_name.trim();
        if doctor_name.is_empty() {
            return Err(ExportError::DoctorNameRequired);
        }

        Ok(Self {
            doctor_name: doctor_name.to_string(),
            visit_date,
            exported_at: chrono::Utc::now().to_rfc3339(),
            raw_rows: project_raw(visits),
            summary: project_summary(&summarize(visits)),
        })
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Raw data sheet as CSV.
    pub fn raw_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        push_row(&mut csv, RAW_HEADERS.iter().copied());

        // Lines
        for row in &self.raw_rows {
            push_row(&mut csv, row.cells().into_iter());
        }

        csv
    }

    /// Day summary sheet as CSV, blocks separated by blank lines.
    ///
    /// The title uses the configured app name with underscores as spaces.
    pub fn summary_csv(&self, config: &CoreConfig) -> String {
        let mut csv = String::new();
        let summary = &self.summary;
        let date = self.visit_date.to_string();
        let title = format!("{} - Day Summary", config.app_name().replace('_', " "));

        push_row(&mut csv, [title.as_str()]);
        push_row(&mut csv, ["Doctor", self.doctor_name.as_str()]);
        push_row(&mut csv, ["Date", date.as_str()]);
        push_row(&mut csv, ["Exported at", self.exported_at.as_str()]);
        csv.push('\n');

        push_row(&mut csv, ["Key Totals"]);
        for line in &summary.totals {
            push_row(&mut csv, [line.label.clone(), line.count.to_string()]);
        }
        csv.push('\n');

        push_row(&mut csv, ["Gender"]);
        for line in &summary.gender {
            push_row(&mut csv, [line.label.clone(), line.count.to_string()]);
        }
        csv.push('\n');

        push_row(&mut csv, ["Disposition"]);
        for line in &summary.disposition {
            push_row(&mut csv, [line.label.clone(), line.count.to_string()]);
        }
        csv.push('\n');

        push_row(&mut csv, ["Age × Gender"]);
        push_row(&mut csv, ["Age Group", "Male", "Female"]);
        for row in &summary.age_gender {
            push_row(
                &mut csv,
                [row.age_group.clone(), row.male.to_string(), row.female.to_string()],
            );
        }
        csv.push('\n');

        push_row(&mut csv, ["Diagnosis counts (Dx1 + Dx2)"]);
        push_row(&mut csv, ["Dx No", "Dx Name", "Count"]);
        for row in &summary.diagnoses {
            push_row(
                &mut csv,
                [row.code.to_string(), row.name.clone(), row.count.to_string()],
            );
        }

        csv
    }
}

/// Builds day exports from storage.
pub struct DayExporter<'a, S> {
    store: &'a S,
}

impl<'a, S> DayExporter<'a, S>
where
    S: VisitStore + SettingsStore,
{
    /// Create a new day exporter.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Export one day using the stored doctor name.
    pub fn export_day(&self, visit_date: NaiveDate) -> ExportResult<DayExport> {
        let doctor_name = self.store.doctor_name()?;
        let visits = self.store.get_by_date(visit_date)?;
        let export = DayExport::build(visit_date, &doctor_name, &visits)?;

        tracing::info!(date = %visit_date, visits = visits.len(), "day export built");
        Ok(export)
    }
}

fn push_row<I, T>(csv: &mut String, cells: I)
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let line: Vec<String> = cells
        .into_iter()
        .map(|cell| escape_csv(cell.as_ref()))
        .collect();
    csv.push_str(&line.join(","));
    csv.push('\n');
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
