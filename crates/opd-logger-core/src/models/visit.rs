//! Visit records and the closed vocabularies they are built from.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::catalog;

/// A label that does not belong to the expected vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed enum whose wire form is a fixed display label.
///
/// Variant order is the declared (export) order, and `Ord` follows it.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// Every variant in declared order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Display label, also used on the wire and in storage.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    _ => Err(UnknownLabel {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

labeled_enum! {
    /// Patient gender.
    Gender, "gender" {
        Male => "Male",
        Female => "Female",
    }
}

labeled_enum! {
    /// Age bracket, mutually exclusive.
    AgeGroup, "age group" {
        /// Under five
        UnderFive => "<5",
        FiveToFourteen => "5-14",
        FifteenToSeventeen => "15-17",
        /// Eighteen and over
        Adult => "≥18",
    }
}

labeled_enum! {
    /// Outcome of the visit.
    Disposition, "disposition" {
        Discharged => "Discharged",
        Admitted => "Admitted",
        ReferredToEd => "Referred to ED",
        ReferredOut => "Referred out",
    }
}

labeled_enum! {
    /// War-wounded status, only meaningful for surgical visits.
    WwStatus, "war-wounded status" {
        WarWounded => "WW",
        NonWarWounded => "Non-WW",
    }
}

/// Normalize a diagnosis selection: ascending, no duplicates.
pub fn normalize_diagnoses(mut codes: Vec<u32>) -> Vec<u32> {
    codes.sort_unstable();
    codes.dedup();
    codes
}

/// A visit is surgical iff any of its diagnoses is a surgical catalog entry.
///
/// Codes missing from the catalog contribute nothing.
pub fn is_surgical_by_dx(codes: &[u32]) -> bool {
    codes
        .iter()
        .filter_map(|code| catalog::lookup(*code))
        .any(|dx| dx.is_surgical())
}

/// Current local time as `HH:MM`.
pub fn current_time_hhmm() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// Current time as epoch milliseconds.
pub fn current_epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One persisted outpatient visit.
///
/// `is_surgical` is always derived from `diagnoses`; the diagnosis list and
/// war-wounded status are only changed through methods that keep the two
/// consistent. Decoding goes through a lenient intermediate form so that
/// legacy data with unknown labels still loads (unknown labels become
/// `None`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredVisit")]
pub struct VisitRecord {
    /// Unique record ID (UUID v4 for records created here)
    pub id: String,
    /// Calendar day the visit belongs to
    pub visit_date: NaiveDate,
    /// Time of day as `HH:MM`
    pub time: String,
    /// Short site-specific patient code
    pub patient_id: String,
    pub gender: Option<Gender>,
    pub age_group: Option<AgeGroup>,
    pub(crate) diagnoses: Vec<u32>,
    pub disposition: Option<Disposition>,
    pub(crate) ww_status: Option<WwStatus>,
    pub(crate) is_surgical: bool,
    /// Epoch milliseconds of the last write
    pub updated_at: i64,
}

impl VisitRecord {
    /// Diagnosis codes, ascending.
    pub fn diagnoses(&self) -> &[u32] {
        &self.diagnoses
    }

    /// War-wounded status (only ever set on surgical visits).
    pub fn ww_status(&self) -> Option<WwStatus> {
        self.ww_status
    }

    /// Whether any diagnosis is surgical.
    pub fn is_surgical(&self) -> bool {
        self.is_surgical
    }

    /// Category derived from the surgical flag.
    pub fn category(&self) -> catalog::Category {
        if self.is_surgical {
            catalog::Category::Surgical
        } else {
            catalog::Category::Medical
        }
    }

    /// Replace the diagnoses, re-deriving the surgical flag.
    pub fn set_diagnoses(&mut self, codes: Vec<u32>) {
        self.diagnoses = normalize_diagnoses(codes);
        self.rederive();
    }

    /// Set the war-wounded status. Ignored for non-surgical visits.
    pub fn set_ww_status(&mut self, status: Option<WwStatus>) {
        self.ww_status = if self.is_surgical { status } else { None };
    }

    fn rederive(&mut self) {
        self.is_surgical = is_surgical_by_dx(&self.diagnoses);
        if !self.is_surgical {
            self.ww_status = None;
        }
    }
}

/// Wire/storage shape of a visit, tolerant of missing and unknown values.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredVisit {
    #[serde(default, deserialize_with = "lenient::text")]
    id: String,
    visit_date: NaiveDate,
    #[serde(default, deserialize_with = "lenient::text")]
    time: String,
    #[serde(default, deserialize_with = "lenient::text")]
    patient_id: String,
    #[serde(default, deserialize_with = "lenient::label")]
    gender: Option<Gender>,
    #[serde(default, deserialize_with = "lenient::label")]
    age_group: Option<AgeGroup>,
    #[serde(default, deserialize_with = "lenient::codes")]
    diagnoses: Vec<u32>,
    #[serde(default, deserialize_with = "lenient::label")]
    disposition: Option<Disposition>,
    #[serde(default, deserialize_with = "lenient::label")]
    ww_status: Option<WwStatus>,
    #[serde(default, deserialize_with = "lenient::millis")]
    updated_at: i64,
}

impl From<StoredVisit> for VisitRecord {
    fn from(stored: StoredVisit) -> Self {
        let id = if stored.id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            stored.id
        };

        let mut record = VisitRecord {
            id,
            visit_date: stored.visit_date,
            time: stored.time,
            patient_id: stored.patient_id,
            gender: stored.gender,
            age_group: stored.age_group,
            diagnoses: normalize_diagnoses(stored.diagnoses),
            disposition: stored.disposition,
            ww_status: stored.ww_status,
            is_surgical: false,
            updated_at: stored.updated_at,
        };
        // A surgical record without a status stays that way; it is counted
        // in the surgical total only.
        record.rederive();
        record
    }
}

/// Field decoders that degrade to "absent" instead of failing.
mod lenient {
    use super::*;
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
    }

    pub fn label<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: std::str::FromStr,
    {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn codes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|n| u32::try_from(n).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        })
    }
}
