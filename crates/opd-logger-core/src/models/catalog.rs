//! Diagnosis catalog.
//!
//! The catalog is fixed at build time. Codes are stable and unique; the
//! list is kept in ascending code order so iteration order is the export
//! order.

use serde::{Deserialize, Serialize};

/// Diagnosis category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    /// Medical case
    #[serde(rename = "M")]
    Medical,
    /// Surgical case (requires a war-wounded status)
    #[serde(rename = "S")]
    Surgical,
}

impl Category {
    /// Single letter used in raw exports.
    pub fn letter(&self) -> &'static str {
        match self {
            Category::Medical => "M",
            Category::Surgical => "S",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Medical => write!(f, "Medical"),
            Category::Surgical => write!(f, "Surgical"),
        }
    }
}

/// A single entry in the diagnosis catalog.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DiagnosisCode {
    /// Stable numeric identifier
    pub code: u32,
    /// Full display name
    pub name: &'static str,
    /// Medical or surgical
    pub category: Category,
    /// Abbreviation for compact display
    pub short_label: &'static str,
}

impl DiagnosisCode {
    const fn new(code: u32, name: &'static str, category: Category, short_label: &'static str) -> Self {
        Self {
            code,
            name,
            category,
            short_label,
        }
    }

    /// Whether this diagnosis makes a visit surgical.
    pub fn is_surgical(&self) -> bool {
        self.category == Category::Surgical
    }
}

use Category::{Medical, Surgical};

/// The reference catalog, ascending by code.
pub const DIAGNOSES: [DiagnosisCode; 21] = [
    DiagnosisCode::new(1, "Respiratory Tract Infection", Medical, "RTI"),
    DiagnosisCode::new(2, "Acute Watery Diarrhea", Medical, "AWD"),
    DiagnosisCode::new(3, "Acute Bloody Diarrhea", Medical, "ABD"),
    DiagnosisCode::new(4, "Acute Viral Hepatitis", Medical, "Hep"),
    DiagnosisCode::new(5, "Other GI Diseases", Medical, "OGI"),
    DiagnosisCode::new(6, "Scabies", Medical, "Scab"),
    DiagnosisCode::new(7, "Skin Infection", Medical, "SkinInf"),
    DiagnosisCode::new(8, "Other Skin Diseases", Medical, "OSkin"),
    DiagnosisCode::new(9, "Genitourinary Diseases", Medical, "GU"),
    DiagnosisCode::new(10, "Musculoskeletal Diseases", Medical, "MSK"),
    DiagnosisCode::new(11, "Hypertension", Medical, "HTN"),
    DiagnosisCode::new(12, "Diabetes", Medical, "DM"),
    DiagnosisCode::new(13, "Epilepsy", Medical, "Epi"),
    DiagnosisCode::new(14, "Eye Diseases", Medical, "Eye"),
    DiagnosisCode::new(15, "ENT Diseases", Medical, "ENT"),
    DiagnosisCode::new(16, "Other Medical Diseases", Medical, "OMed"),
    DiagnosisCode::new(17, "Fracture", Surgical, "Fx"),
    DiagnosisCode::new(18, "Burn", Surgical, "Burn"),
    DiagnosisCode::new(19, "Gunshot Wound (GSW)", Surgical, "GSW"),
    DiagnosisCode::new(20, "Other Wound", Surgical, "Wound"),
    DiagnosisCode::new(21, "Other Surgical", Surgical, "OSurg"),
];

/// Look up a diagnosis by code. Unknown codes yield `None`.
pub fn lookup(code: u32) -> Option<&'static DiagnosisCode> {
    DIAGNOSES.iter().find(|d| d.code == code)
}

/// All catalog entries in ascending code order.
pub fn all_diagnoses() -> &'static [DiagnosisCode] {
    &DIAGNOSES
}
