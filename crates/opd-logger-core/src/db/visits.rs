//! Visit database operations.

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::{Database, DbError, DbResult, VisitStore};
use crate::models::VisitRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl VisitStore for Database {
    fn put(&self, visit: &VisitRecord) -> DbResult<()> {
        upsert(&self.conn, visit)
    }

    fn put_all(&self, visits: &[VisitRecord]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for visit in visits {
            upsert(&tx, visit)?;
        }
        tx.commit()?;
        tracing::debug!(visits = visits.len(), "visit batch committed");
        Ok(())
    }

    fn get_by_date(&self, date: NaiveDate) -> DbResult<Vec<VisitRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, visit_date, time, patient_id, gender, age_group,
                   diagnoses, disposition, ww_status, updated_at
            FROM visits
            WHERE visit_date = ?
            ORDER BY time, id
            "#,
        )?;

        let rows = stmt.query_map([date.format(DATE_FORMAT).to_string()], VisitRow::from_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }

    fn list_distinct_dates(&self) -> DbResult<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT visit_date FROM visits ORDER BY visit_date DESC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(parse_date(&row?)?);
        }
        Ok(dates)
    }

    fn delete_by_id(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM visits WHERE id = ?", [id])?;
        tracing::debug!(id, deleted = rows_affected > 0, "visit delete");
        Ok(rows_affected > 0)
    }

    fn list_all(&self) -> DbResult<Vec<VisitRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, visit_date, time, patient_id, gender, age_group,
                   diagnoses, disposition, ww_status, updated_at
            FROM visits
            ORDER BY visit_date, time, id
            "#,
        )?;

        let rows = stmt.query_map([], VisitRow::from_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }
}

impl Database {
    /// Get a single visit by ID.
    pub fn get_visit(&self, id: &str) -> DbResult<Option<VisitRecord>> {
        use rusqlite::OptionalExtension;

        self.conn
            .query_row(
                r#"
                SELECT id, visit_date, time, patient_id, gender, age_group,
                       diagnoses, disposition, ww_status, updated_at
                FROM visits
                WHERE id = ?
                "#,
                [id],
                VisitRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a visit that must exist.
    pub fn require_visit(&self, id: &str) -> DbResult<VisitRecord> {
        self.get_visit(id)?
            .ok_or_else(|| DbError::NotFound(format!("visit {}", id)))
    }

    /// Number of stored visits.
    pub fn count_visits(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn upsert(conn: &Connection, visit: &VisitRecord) -> DbResult<()> {
    let diagnoses_json = serde_json::to_string(visit.diagnoses())?;

    conn.execute(
        r#"
        INSERT INTO visits (
            id, visit_date, time, patient_id, gender, age_group,
            diagnoses, disposition, ww_status, is_surgical, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            visit_date = excluded.visit_date,
            time = excluded.time,
            patient_id = excluded.patient_id,
            gender = excluded.gender,
            age_group = excluded.age_group,
            diagnoses = excluded.diagnoses,
            disposition = excluded.disposition,
            ww_status = excluded.ww_status,
            is_surgical = excluded.is_surgical,
            updated_at = excluded.updated_at
        "#,
        params![
            visit.id,
            visit.visit_date.format(DATE_FORMAT).to_string(),
            visit.time,
            visit.patient_id,
            visit.gender.map(|g| g.label()),
            visit.age_group.map(|a| a.label()),
            diagnoses_json,
            visit.disposition.map(|d| d.label()),
            visit.ww_status().map(|w| w.label()),
            visit.is_surgical(),
            visit.updated_at,
        ],
    )?;

    tracing::debug!(id = %visit.id, date = %visit.visit_date, "visit stored");
    Ok(())
}

/// Intermediate row struct for database mapping.
struct VisitRow {
    id: String,
    visit_date: String,
    time: String,
    patient_id: String,
    gender: Option<String>,
    age_group: Option<String>,
    diagnoses: String,
    disposition: Option<String>,
    ww_status: Option<String>,
    updated_at: i64,
}

impl VisitRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            visit_date: row.get(1)?,
            time: row.get(2)?,
            patient_id: row.get(3)?,
            gender: row.get(4)?,
            age_group: row.get(5)?,
            diagnoses: row.get(6)?,
            disposition: row.get(7)?,
            ww_status: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl TryFrom<VisitRow> for VisitRecord {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let mut visit = VisitRecord {
            id: row.id,
            visit_date: parse_date(&row.visit_date)?,
            time: row.time,
            patient_id: row.patient_id,
            gender: parse_label(row.gender)?,
            age_group: parse_label(row.age_group)?,
            diagnoses: Vec::new(),
            disposition: parse_label(row.disposition)?,
            ww_status: None,
            is_surgical: false,
            updated_at: row.updated_at,
        };
        visit.set_diagnoses(serde_json::from_str(&row.diagnoses)?);
        visit.set_ww_status(parse_label(row.ww_status)?);
        Ok(visit)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DbError::Constraint(format!("Invalid visit date {:?}: {}", s, e)))
}

fn parse_label<T>(value: Option<String>) -> Result<Option<T>, DbError>
where
    T: std::str::FromStr<Err = crate::models::UnknownLabel>,
{
    value
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| DbError::Constraint(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeGroup, Disposition, Gender, VisitDraft, WwStatus};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn make_visit(day: u32, time: &str, diagnoses: &[u32]) -> VisitRecord {
        let mut draft = VisitDraft::new();
        draft.time = time.into();
        draft.patient_id = "42".into();
        draft.gender = Some(Gender::Female);
        draft.age_group = Some(AgeGroup::FifteenToSeventeen);
        draft.set_diagnoses(diagnoses.to_vec());
        draft.set_ww_status(Some(WwStatus::NonWarWounded));
        draft.disposition = Some(Disposition::ReferredOut);
        draft.into_record(date(day)).unwrap()
    }

    #[test]
    fn test_save_and_get_by_date() {
        let db = setup_db();
        let mut visit = make_visit(1, "10:00", &[5, 18]);
        db.save(&mut visit).unwrap();

        let visits = db.get_by_date(date(1)).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0], visit);
        assert!(visits[0].is_surgical());
        assert_eq!(visits[0].ww_status(), Some(WwStatus::NonWarWounded));

        assert!(db.get_by_date(date(2)).unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_and_bumps_updated_at() {
        let db = setup_db();
        let mut visit = make_visit(1, "10:00", &[1]);
        visit.updated_at = 0;
        db.save(&mut visit).unwrap();
        assert!(visit.updated_at > 0);

        visit.patient_id = "7".into();
        db.save(&mut visit).unwrap();

        let visits = db.get_by_date(date(1)).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].patient_id, "7");
        assert_eq!(db.count_visits().unwrap(), 1);
    }

    #[test]
    fn test_put_keeps_updated_at() {
        let db = setup_db();
        let mut visit = make_visit(1, "10:00", &[1]);
        visit.updated_at = 1234;
        db.put(&visit).unwrap();

        let stored = db.get_visit(&visit.id).unwrap().unwrap();
        assert_eq!(stored.updated_at, 1234);
    }

    #[test]
    fn test_put_all_rolls_back_on_failure() {
        let db = setup_db();
        db.conn()
            .execute_batch(
                r#"
                CREATE TRIGGER reject_second BEFORE INSERT ON visits
                WHEN NEW.patient_id = '2'
                BEGIN SELECT RAISE(ABORT, 'rejected'); END;
                "#,
            )
            .unwrap();

        let visits: Vec<VisitRecord> = ["1", "2", "3"]
            .iter()
            .map(|patient_id| {
                let mut visit = make_visit(1, "10:00", &[1]);
                visit.patient_id = patient_id.to_string();
                visit
            })
            .collect();

        assert!(db.put_all(&visits).is_err());
        assert_eq!(db.count_visits().unwrap(), 0);

        db.put_all(&[visits[0].clone(), visits[2].clone()]).unwrap();
        assert_eq!(db.count_visits().unwrap(), 2);
    }

    #[test]
    fn test_require_visit() {
        let db = setup_db();
        let mut visit = make_visit(1, "10:00", &[1]);
        db.save(&mut visit).unwrap();

        assert_eq!(db.require_visit(&visit.id).unwrap(), visit);
        assert!(matches!(
            db.require_visit("missing"),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_get_by_date_ordered_by_time() {
        let db = setup_db();
        for time in ["11:30", "08:05", "09:45"] {
            let mut visit = make_visit(3, time, &[2]);
            db.save(&mut visit).unwrap();
        }

        let times: Vec<String> = db
            .get_by_date(date(3))
            .unwrap()
            .into_iter()
            .map(|v| v.time)
            .collect();
        assert_eq!(times, vec!["08:05", "09:45", "11:30"]);
    }

    #[test]
    fn test_list_distinct_dates_newest_first() {
        let db = setup_db();
        for day in [2, 9, 2, 5] {
            let mut visit = make_visit(day, "10:00", &[1]);
            db.save(&mut visit).unwrap();
        }

        let dates = db.list_distinct_dates().unwrap();
        assert_eq!(dates, vec![date(9), date(5), date(2)]);
    }

    #[test]
    fn test_delete_by_id() {
        let db = setup_db();
        let mut visit = make_visit(1, "10:00", &[1]);
        db.save(&mut visit).unwrap();

        assert!(db.delete_by_id(&visit.id).unwrap());
        assert!(!db.delete_by_id(&visit.id).unwrap());
        assert!(db.get_by_date(date(1)).unwrap().is_empty());
        assert!(db.list_distinct_dates().unwrap().is_empty());
    }

    #[test]
    fn test_absent_labels_round_trip() {
        let db = setup_db();
        let legacy: VisitRecord = serde_json::from_str(
            r#"{"id": "legacy-1", "visitDate": "2024-07-04", "gender": "?", "diagnoses": [21]}"#,
        )
        .unwrap();
        db.put(&legacy).unwrap();

        let stored = db.get_visit("legacy-1").unwrap().unwrap();
        assert_eq!(stored, legacy);
        assert_eq!(stored.gender, None);
        assert!(stored.is_surgical());
        assert_eq!(stored.ww_status(), None);
    }

    #[test]
    fn test_corrupt_label_is_constraint_error() {
        let db = setup_db();
        db.conn()
            .execute(
                "INSERT INTO visits (id, visit_date, gender) VALUES ('bad', '2024-07-01', 'X')",
                [],
            )
            .unwrap();

        let result = db.get_visit("bad");
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }
}
