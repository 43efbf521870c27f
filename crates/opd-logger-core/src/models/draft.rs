//! Visit drafts and the rules a draft must pass before it is persisted.

use chrono::NaiveDate;
use thiserror::Error;

use super::catalog;
use super::visit::{
    current_epoch_millis, current_time_hhmm, is_surgical_by_dx, normalize_diagnoses, AgeGroup,
    Disposition, Gender, VisitRecord, WwStatus,
};

/// Maximum number of diagnoses on one visit.
pub const MAX_DIAGNOSES: usize = 2;

/// Maximum patient ID length (characters).
pub const MAX_PATIENT_ID_LEN: usize = 3;

/// The single reason a draft was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Patient ID is required.")]
    PatientIdRequired,

    #[error("Patient ID must be at most 3 characters.")]
    PatientIdTooLong,

    #[error("Gender is required.")]
    GenderRequired,

    #[error("Age group is required.")]
    AgeGroupRequired,

    #[error("Select at least 1 diagnosis.")]
    DiagnosisRequired,

    #[error("Select WW or Non-WW for surgical cases.")]
    WwStatusRequired,

    #[error("Disposition is required.")]
    DispositionRequired,

    #[error("Select at most 2 diagnoses.")]
    TooManyDiagnoses,

    #[error("Unknown diagnosis code: {0}")]
    UnknownDiagnosis(u32),
}

pub type ValidationResult = Result<(), ValidationError>;

/// Toggle a diagnosis code in a selection.
///
/// Removes the code if present, otherwise adds it unless the selection is
/// already full. The result is always ascending.
pub fn toggle_diagnosis(selected: &[u32], code: u32) -> Vec<u32> {
    let mut codes = selected.to_vec();
    if let Some(idx) = codes.iter().position(|c| *c == code) {
        codes.remove(idx);
    } else if codes.len() < MAX_DIAGNOSES {
        codes.push(code);
    }
    normalize_diagnoses(codes)
}

/// An unsaved, editable visit.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitDraft {
    /// Set when editing a stored record
    pub id: Option<String>,
    pub time: String,
    pub patient_id: String,
    pub gender: Option<Gender>,
    pub age_group: Option<AgeGroup>,
    diagnoses: Vec<u32>,
    pub disposition: Option<Disposition>,
    ww_status: Option<WwStatus>,
    is_surgical: bool,
    /// Date of the stored record being edited
    visit_date: Option<NaiveDate>,
}

impl Default for VisitDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitDraft {
    /// A blank draft stamped with the current time, disposition Discharged.
    pub fn new() -> Self {
        Self {
            id: None,
            time: current_time_hhmm(),
            patient_id: String::new(),
            gender: None,
            age_group: None,
            diagnoses: Vec::new(),
            disposition: Some(Disposition::Discharged),
            ww_status: None,
            is_surgical: false,
            visit_date: None,
        }
    }

    /// Load a stored record for editing.
    pub fn from_record(record: &VisitRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            time: record.time.clone(),
            patient_id: record.patient_id.clone(),
            gender: record.gender,
            age_group: record.age_group,
            diagnoses: record.diagnoses.clone(),
            disposition: record.disposition,
            ww_status: record.ww_status,
            is_surgical: record.is_surgical,
            visit_date: Some(record.visit_date),
        }
    }

    pub fn diagnoses(&self) -> &[u32] {
        &self.diagnoses
    }

    pub fn ww_status(&self) -> Option<WwStatus> {
        self.ww_status
    }

    pub fn is_surgical(&self) -> bool {
        self.is_surgical
    }

    /// Visit date of the record being edited, `None` for new drafts.
    pub fn visit_date(&self) -> Option<NaiveDate> {
        self.visit_date
    }

    /// Toggle one diagnosis; a third selection is a no-op.
    pub fn toggle_diagnosis(&mut self, code: u32) {
        self.diagnoses = toggle_diagnosis(&self.diagnoses, code);
        self.rederive();
    }

    /// Replace the whole selection.
    pub fn set_diagnoses(&mut self, codes: Vec<u32>) {
        self.diagnoses = normalize_diagnoses(codes);
        self.rederive();
    }

    /// Only surgical drafts hold a status; set the diagnoses first.
    pub fn set_ww_status(&mut self, status: Option<WwStatus>) {
        self.ww_status = if self.is_surgical { status } else { None };
    }

    fn rederive(&mut self) {
        self.is_surgical = is_surgical_by_dx(&self.diagnoses);
        if !self.is_surgical {
            self.ww_status = None;
        }
    }

    /// Validate, then build the record for `visit_date`.
    ///
    /// Editing keeps the draft's ID and the stored visit date, ignoring
    /// `visit_date`; new drafts get a fresh UUID.
    pub fn into_record(self, visit_date: NaiveDate) -> Result<VisitRecord, ValidationError> {
        validate(&self)?;

        let is_surgical = is_surgical_by_dx(&self.diagnoses);
        let time = if self.time.is_empty() {
            current_time_hhmm()
        } else {
            self.time
        };

        let (id, visit_date) = match self.id {
            Some(id) => (id, self.visit_date.unwrap_or(visit_date)),
            None => (uuid::Uuid::new_v4().to_string(), visit_date),
        };

        Ok(VisitRecord {
            id,
            visit_date,
            time,
            patient_id: self.patient_id.trim().to_string(),
            gender: self.gender,
            age_group: self.age_group,
            diagnoses: self.diagnoses,
            disposition: self.disposition,
            ww_status: if is_surgical { self.ww_status } else { None },
            is_surgical,
            updated_at: current_epoch_millis(),
        })
    }
}

/// Check a draft. The first failing rule wins, in form order:
/// patient ID, gender, age group, diagnosis, WW status (surgical only),
/// disposition. Catalog checks on the diagnoses come last.
pub fn validate(draft: &VisitDraft) -> ValidationResult {
    let patient_id = draft.patient_id.trim();
    if patient_id.is_empty() {
        return Err(ValidationError::PatientIdRequired);
    }
    if patient_id.chars().count() > MAX_PATIENT_ID_LEN {
        return Err(ValidationError::PatientIdTooLong);
    }
    if draft.gender.is_none() {
        return Err(ValidationError::GenderRequired);
    }
    if draft.age_group.is_none() {
        return Err(ValidationError::AgeGroupRequired);
    }
    if draft.diagnoses.is_empty() {
        return Err(ValidationError::DiagnosisRequired);
    }
    if draft.is_surgical && draft.ww_status.is_none() {
        return Err(ValidationError::WwStatusRequired);
    }
    if draft.disposition.is_none() {
        return Err(ValidationError::DispositionRequired);
    }
    if draft.diagnoses.len() > MAX_DIAGNOSES {
        return Err(ValidationError::TooManyDiagnoses);
    }
    if let Some(code) = draft
        .diagnoses
        .iter()
        .find(|code| catalog::lookup(**code).is_none())
    {
        return Err(ValidationError::UnknownDiagnosis(*code));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> VisitDraft {
        let mut draft = VisitDraft::new();
        draft.patient_id = "12".into();
        draft.gender = Some(Gender::Male);
        draft.age_group = Some(AgeGroup::UnderFive);
        draft.toggle_diagnosis(1);
        draft
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = VisitDraft::new();
        assert_eq!(draft.disposition, Some(Disposition::Discharged));
        assert_eq!(draft.time.len(), 5);
        assert!(draft.diagnoses().is_empty());
        assert!(!draft.is_surgical());
    }

    #[test]
    fn test_complete_draft_is_valid() {
        assert_eq!(validate(&complete_draft()), Ok(()));
    }

    #[test]
    fn test_patient_id_reported_before_gender() {
        let mut draft = complete_draft();
        draft.patient_id.clear();
        draft.gender = None;
        assert_eq!(validate(&draft), Err(ValidationError::PatientIdRequired));
    }

    #[test]
    fn test_priority_order() {
        let mut draft = VisitDraft::new();
        draft.disposition = None;
        draft.patient_id = "7".into();
        assert_eq!(validate(&draft), Err(ValidationError::GenderRequired));

        draft.gender = Some(Gender::Female);
        assert_eq!(validate(&draft), Err(ValidationError::AgeGroupRequired));

        draft.age_group = Some(AgeGroup::Adult);
        assert_eq!(validate(&draft), Err(ValidationError::DiagnosisRequired));

        draft.toggle_diagnosis(19);
        assert_eq!(validate(&draft), Err(ValidationError::WwStatusRequired));

        draft.set_ww_status(Some(WwStatus::WarWounded));
        assert_eq!(validate(&draft), Err(ValidationError::DispositionRequired));

        draft.disposition = Some(Disposition::Admitted);
        assert_eq!(validate(&draft), Ok(()));
    }

    #[test]
    fn test_ww_not_required_for_medical() {
        let draft = complete_draft();
        assert!(!draft.is_surgical());
        assert_eq!(draft.ww_status(), None);
        assert!(validate(&draft).is_ok());
    }

    #[test]
    fn test_whitespace_patient_id_is_missing() {
        let mut draft = complete_draft();
        draft.patient_id = "   ".into();
        assert_eq!(validate(&draft), Err(ValidationError::PatientIdRequired));
    }

    #[test]
    fn test_patient_id_too_long() {
        let mut draft = complete_draft();
        draft.patient_id = "1234".into();
        assert_eq!(validate(&draft), Err(ValidationError::PatientIdTooLong));
    }

    #[test]
    fn test_unknown_and_excess_diagnoses_rejected() {
        let mut draft = complete_draft();
        draft.set_diagnoses(vec![1, 2, 3]);
        assert_eq!(validate(&draft), Err(ValidationError::TooManyDiagnoses));

        draft.set_diagnoses(vec![1, 42]);
        assert_eq!(validate(&draft), Err(ValidationError::UnknownDiagnosis(42)));
    }

    #[test]
    fn test_toggle_third_is_noop() {
        let selected = toggle_diagnosis(&toggle_diagnosis(&[], 9), 4);
        assert_eq!(selected, vec![4, 9]);
        assert_eq!(toggle_diagnosis(&selected, 1), vec![4, 9]);
        assert_eq!(toggle_diagnosis(&selected, 9), vec![4]);
    }

    #[test]
    fn test_toggle_rederives_surgical() {
        let mut draft = complete_draft();
        draft.toggle_diagnosis(18);
        assert!(draft.is_surgical());
        draft.set_ww_status(Some(WwStatus::NonWarWounded));

        draft.toggle_diagnosis(18);
        assert!(!draft.is_surgical());
        assert_eq!(draft.ww_status(), None);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::WwStatusRequired.to_string(),
            "Select WW or Non-WW for surgical cases."
        );
        assert_eq!(
            ValidationError::PatientIdRequired.to_string(),
            "Patient ID is required."
        );
    }

    #[test]
    fn test_into_record() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let mut draft = complete_draft();
        draft.toggle_diagnosis(17);
        draft.set_ww_status(Some(WwStatus::WarWounded));
        draft.time = "09:30".into();

        let record = draft.into_record(date).unwrap();
        assert_eq!(record.id.len(), 36);
        assert_eq!(record.visit_date, date);
        assert_eq!(record.time, "09:30");
        assert_eq!(record.diagnoses(), &[1, 17]);
        assert!(record.is_surgical());
        assert_eq!(record.ww_status(), Some(WwStatus::WarWounded));
    }

    #[test]
    fn test_into_record_keeps_id_when_editing() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let record = complete_draft().into_record(date).unwrap();

        let mut draft = VisitDraft::from_record(&record);
        draft.gender = Some(Gender::Female);
        let edited = draft.into_record(date).unwrap();

        assert_eq!(edited.id, record.id);
        assert_eq!(edited.gender, Some(Gender::Female));
    }

    #[test]
    fn test_edit_keeps_visit_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        let record = complete_draft().into_record(date).unwrap();

        let draft = VisitDraft::from_record(&record);
        assert_eq!(draft.visit_date(), Some(date));
        assert_eq!(VisitDraft::new().visit_date(), None);

        let edited = draft.into_record(later).unwrap();
        assert_eq!(edited.id, record.id);
        assert_eq!(edited.visit_date, date);
    }

    #[test]
    fn test_into_record_rejects_invalid() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let err = VisitDraft::new().into_record(date).unwrap_err();
        assert_eq!(err, ValidationError::PatientIdRequired);
    }
}
