//! Day summary aggregation.
//!
//! `summarize` folds the visits of one day into cross-tabulated counts.
//! Every map is seeded with the full domain of its key (all dispositions,
//! all age groups, every catalog code) and is never grown afterwards, so the
//! result always covers the whole domain. Values outside the domain (absent
//! labels, unknown diagnosis codes from legacy data) are skipped rather than
//! rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{all_diagnoses, AgeGroup, Disposition, Gender, VisitRecord, WwStatus};

/// Male/female pair of counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenderCounts {
    #[serde(rename = "Male")]
    pub male: u32,
    #[serde(rename = "Female")]
    pub female: u32,
}

impl GenderCounts {
    /// Count for one gender.
    pub fn get(&self, gender: Gender) -> u32 {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
        }
    }

    fn increment(&mut self, gender: Gender) {
        match gender {
            Gender::Male => self.male += 1,
            Gender::Female => self.female += 1,
        }
    }
}

/// Cross-tabulation of one day's visits. Recomputed on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub total: u32,
    pub male_count: u32,
    pub female_count: u32,
    pub surgical_total: u32,
    pub war_wounded_count: u32,
    pub non_war_wounded_count: u32,
    pub disposition_counts: BTreeMap<Disposition, u32>,
    pub age_by_gender_counts: BTreeMap<AgeGroup, GenderCounts>,
    pub diagnosis_counts: BTreeMap<u32, u32>,
}

impl Default for DaySummary {
    fn default() -> Self {
        Self::empty()
    }
}

impl DaySummary {
    /// All counters at zero, every domain key present.
    pub fn empty() -> Self {
        Self {
            total: 0,
            male_count: 0,
            female_count: 0,
            surgical_total: 0,
            war_wounded_count: 0,
            non_war_wounded_count: 0,
            disposition_counts: Disposition::ALL.iter().map(|d| (*d, 0)).collect(),
            age_by_gender_counts: AgeGroup::ALL
                .iter()
                .map(|a| (*a, GenderCounts::default()))
                .collect(),
            diagnosis_counts: all_diagnoses().iter().map(|dx| (dx.code, 0)).collect(),
        }
    }

    /// Disposition count; zero for every declared disposition with no visits.
    pub fn disposition(&self, disposition: Disposition) -> u32 {
        self.disposition_counts.get(&disposition).copied().unwrap_or(0)
    }

    /// Age-by-gender cell.
    pub fn age_gender(&self, age_group: AgeGroup, gender: Gender) -> u32 {
        self.age_by_gender_counts
            .get(&age_group)
            .map_or(0, |counts| counts.get(gender))
    }

    /// Occurrences of a diagnosis code across both slots.
    pub fn diagnosis(&self, code: u32) -> u32 {
        self.diagnosis_counts.get(&code).copied().unwrap_or(0)
    }

    /// Fold one visit into the tallies.
    fn add(&mut self, visit: &VisitRecord) {
        self.total += 1;

        match visit.gender {
            Some(Gender::Male) => self.male_count += 1,
            Some(Gender::Female) => self.female_count += 1,
            None => {}
        }

        if let Some(count) = visit
            .disposition
            .and_then(|d| self.disposition_counts.get_mut(&d))
        {
            *count += 1;
        }

        if let (Some(age_group), Some(gender)) = (visit.age_group, visit.gender) {
            if let Some(cell) = self.age_by_gender_counts.get_mut(&age_group) {
                cell.increment(gender);
            }
        }

        for code in visit.diagnoses() {
            if let Some(count) = self.diagnosis_counts.get_mut(code) {
                *count += 1;
            }
        }

        // A surgical visit without a status still counts toward the total.
        if visit.is_surgical() {
            self.surgical_total += 1;
            match visit.ww_status() {
                Some(WwStatus::WarWounded) => self.war_wounded_count += 1,
                Some(WwStatus::NonWarWounded) => self.non_war_wounded_count += 1,
                None => {}
            }
        }
    }
}

/// Summarize a day's visits. Pure and independent of input order.
pub fn summarize<'a, I>(visits: I) -> DaySummary
where
    I: IntoIterator<Item = &'a VisitRecord>,
{
    visits
        .into_iter()
        .fold(DaySummary::empty(), |mut summary, visit| {
            summary.add(visit);
            summary
        })
}
