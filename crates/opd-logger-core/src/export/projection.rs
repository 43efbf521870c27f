//! Flat tabular projections of visits and day summaries.
//!
//! Renderers (CSV, JSON, spreadsheets) consume these structures; every block
//! iterates its domain in the declared order, never in map order.

use serde::{Deserialize, Serialize};

use crate::models::{all_diagnoses, AgeGroup, Disposition, Gender, VisitRecord};
use crate::summary::DaySummary;

/// Column headers for raw rows.
pub const RAW_HEADERS: [&str; 9] = [
    "Time",
    "Patient ID",
    "Gender",
    "Age Group",
    "Dx1",
    "Dx2",
    "Category",
    "WW/Non-WW",
    "Disposition",
];

/// One visit as a row of display strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRow {
    pub time: String,
    pub patient_id: String,
    pub gender: String,
    pub age_group: String,
    /// First diagnosis code, empty if none
    pub dx1: String,
    /// Second diagnosis code, empty if none
    pub dx2: String,
    /// "S" or "M"
    pub category: String,
    /// Empty unless surgical
    pub ww_status: String,
    pub disposition: String,
}

impl RawRow {
    fn from_visit(visit: &VisitRecord) -> Self {
        let dx = |slot: usize| {
            visit
                .diagnoses()
                .get(slot)
                .map(|code| code.to_string())
                .unwrap_or_default()
        };
        let ww_status = if visit.is_surgical() {
            visit.ww_status().map(|w| w.label()).unwrap_or_default()
        } else {
            ""
        };

        Self {
            time: visit.time.clone(),
            patient_id: visit.patient_id.clone(),
            gender: visit.gender.map(|g| g.label()).unwrap_or_default().to_string(),
            age_group: visit
                .age_group
                .map(|a| a.label())
                .unwrap_or_default()
                .to_string(),
            dx1: dx(0),
            dx2: dx(1),
            category: visit.category().letter().to_string(),
            ww_status: ww_status.to_string(),
            disposition: visit
                .disposition
                .map(|d| d.label())
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Cells in header order.
    pub fn cells(&self) -> [&str; 9] {
        [
            &self.time,
            &self.patient_id,
            &self.gender,
            &self.age_group,
            &self.dx1,
            &self.dx2,
            &self.category,
            &self.ww_status,
            &self.disposition,
        ]
    }
}

/// Project visits to raw rows, ascending by `HH:MM` time.
///
/// The sort is stable: visits sharing a time keep their input order.
pub fn project_raw(visits: &[VisitRecord]) -> Vec<RawRow> {
    let mut ordered: Vec<&VisitRecord> = visits.iter().collect();
    ordered.sort_by(|a, b| a.time.cmp(&b.time));
    ordered.into_iter().map(RawRow::from_visit).collect()
}

/// A labelled count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountLine {
    pub label: String,
    pub count: u32,
}

impl CountLine {
    fn new(label: impl Into<String>, count: u32) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// One age group row of the age × gender table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgeGenderRow {
    pub age_group: String,
    pub male: u32,
    pub female: u32,
}

/// One catalog entry with its count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosisRow {
    pub code: u32,
    pub name: String,
    pub count: u32,
}

/// A day summary laid out as ordered blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummarySections {
    /// Total visits, surgical total, WW, Non-WW
    pub totals: Vec<CountLine>,
    /// Male, Female
    pub gender: Vec<CountLine>,
    /// Discharged, Admitted, Referred to ED, Referred out
    pub disposition: Vec<CountLine>,
    /// `<5`, `5-14`, `15-17`, `≥18`
    pub age_gender: Vec<AgeGenderRow>,
    /// Full catalog, ascending by code
    pub diagnoses: Vec<DiagnosisRow>,
}

/// Lay out a summary in fixed block order.
pub fn project_summary(summary: &DaySummary) -> SummarySections {
    let totals = vec![
        CountLine::new("Total visits", summary.total),
        CountLine::new("Surgical total", summary.surgical_total),
        CountLine::new("WW", summary.war_wounded_count),
        CountLine::new("Non-WW", summary.non_war_wounded_count),
    ];

    let gender = vec![
        CountLine::new(Gender::Male.label(), summary.male_count),
        CountLine::new(Gender::Female.label(), summary.female_count),
    ];

    let disposition = Disposition::ALL
        .iter()
        .map(|d| CountLine::new(d.label(), summary.disposition(*d)))
        .collect();

    let age_gender = AgeGroup::ALL
        .iter()
        .map(|a| AgeGenderRow {
            age_group: a.label().to_string(),
            male: summary.age_gender(*a, Gender::Male),
            female: summary.age_gender(*a, Gender::Female),
        })
        .collect();

    let diagnoses = all_diagnoses()
        .iter()
        .map(|dx| DiagnosisRow {
            code: dx.code,
            name: dx.name.to_string(),
            count: summary.diagnosis(dx.code),
        })
        .collect();

    SummarySections {
        totals,
        gender,
        disposition,
        age_gender,
        diagnoses,
    }
}
