//! Visit database operations.
//!
//! Timestamp filters go through SQLite's `datetime()` so RFC3339 values and
//! the `datetime('now')` strings written by triggers compare correctly.

use rusqlite::{params, OptionalExtension};

use super::{map_constraint, Database, DbResult};
use crate::models::Visit;

const VISIT_COLUMNS: &str = "id, patient_id, visit_number, is_free_visit, charges, paid, \
                             notes, created_by, created_at, updated_at";

impl Database {
    /// Insert a new visit. A duplicate `(patient_id, visit_number)` pair
    /// surfaces as [`DbError::Constraint`](super::DbError::Constraint); this
    /// is the backstop for concurrent recordings of the same patient.
    pub fn insert_visit(&self, visit: &Visit) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO visits (
                    id, patient_id, visit_number, is_free_visit, charges, paid,
                    notes, created_by, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    visit.id,
                    visit.patient_id,
                    visit.visit_number,
                    visit.is_free_visit,
                    visit.charges,
                    visit.paid,
                    visit.notes,
                    visit.created_by,
                    visit.created_at,
                    visit.updated_at,
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    /// Get a visit by ID.
    pub fn get_visit(&self, id: &str) -> DbResult<Option<Visit>> {
        self.conn
            .query_row(
                &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?"),
                [id],
                map_visit_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all visits for a patient, most recent ordinal first.
    pub fn list_visits_for_patient(&self, patient_id: &str) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits
             WHERE patient_id = ?
             ORDER BY visit_number DESC"
        ))?;

        let rows = stmt.query_map([patient_id], map_visit_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count a patient's visits inside a half-open `[start, end)` window.
    pub fn count_visits_in_window(
        &self,
        patient_id: &str,
        start: &str,
        end: &str,
    ) -> DbResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM visits
             WHERE patient_id = ?1
             AND datetime(created_at) >= datetime(?2)
             AND datetime(created_at) < datetime(?3)",
            params![patient_id, start, end],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// List a patient's visits inside a half-open `[start, end)` window,
    /// oldest first.
    pub fn list_visits_in_window(
        &self,
        patient_id: &str,
        start: &str,
        end: &str,
    ) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits
             WHERE patient_id = ?1
             AND datetime(created_at) >= datetime(?2)
             AND datetime(created_at) < datetime(?3)
             ORDER BY datetime(created_at) ASC"
        ))?;

        let rows = stmt.query_map(params![patient_id, start, end], map_visit_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Flip a visit to paid. Returns whether a row was changed.
    pub fn set_visit_paid(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("UPDATE visits SET paid = 1 WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Delete all visits belonging to a patient. Returns the deleted count.
    pub fn delete_visits_for_patient(&self, patient_id: &str) -> DbResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM visits WHERE patient_id = ?", [patient_id])?;
        Ok(deleted)
    }

    /// Delete every visit created strictly before `cutoff`, across all
    /// patients. Patient counters are left untouched by design.
    pub fn delete_visits_before(&self, cutoff: &str) -> DbResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM visits WHERE datetime(created_at) < datetime(?)",
            [cutoff],
        )?;
        Ok(deleted)
    }
}

fn map_visit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        visit_number: row.get(2)?,
        is_free_visit: row.get(3)?,
        charges: row.get(4)?,
        paid: row.get(5)?,
        notes: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::DbError;
    use super::*;
    use crate::models::Patient;
    use chrono::{Duration, Utc};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("AB-12".into(), "Nour".into(), "u1".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn make_visit(patient_id: &str, number: i64) -> Visit {
        Visit::new(
            patient_id.to_string(),
            number,
            true,
            0.0,
            String::new(),
            "u1".into(),
            Utc::now(),
        )
    }

    #[test]
    fn test_insert_and_get() {
        let (db, patient) = setup_db();

        let visit = make_visit(&patient.id, 1);
        db.insert_visit(&visit).unwrap();

        let retrieved = db.get_visit(&visit.id).unwrap().unwrap();
        assert_eq!(retrieved.patient_id, patient.id);
        assert_eq!(retrieved.visit_number, 1);
        assert!(retrieved.is_free_visit);
        assert!(retrieved.paid);
    }

    #[test]
    fn test_duplicate_visit_number_is_constraint_error() {
        let (db, patient) = setup_db();

        db.insert_visit(&make_visit(&patient.id, 1)).unwrap();
        let result = db.insert_visit(&make_visit(&patient.id, 1));

        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_window_count_and_list() {
        let (db, patient) = setup_db();
        let now = Utc::now();

        let mut old = make_visit(&patient.id, 1);
        old.created_at = (now - Duration::days(60)).to_rfc3339();
        db.insert_visit(&old).unwrap();

        db.insert_visit(&make_visit(&patient.id, 2)).unwrap();
        db.insert_visit(&make_visit(&patient.id, 3)).unwrap();

        let start = (now - Duration::days(1)).to_rfc3339();
        let end = (now + Duration::days(1)).to_rfc3339();

        assert_eq!(db.count_visits_in_window(&patient.id, &start, &end).unwrap(), 2);

        let listed = db.list_visits_in_window(&patient.id, &start, &end).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at <= listed[1].created_at);
    }

    #[test]
    fn test_window_is_half_open() {
        let (db, patient) = setup_db();

        let mut visit = make_visit(&patient.id, 1);
        visit.created_at = "2024-03-01T00:00:00.000Z".into();
        db.insert_visit(&visit).unwrap();

        // Start boundary is inclusive
        assert_eq!(
            db.count_visits_in_window(&patient.id, "2024-03-01 00:00:00", "2024-04-01 00:00:00")
                .unwrap(),
            1
        );
        // End boundary is exclusive
        assert_eq!(
            db.count_visits_in_window(&patient.id, "2024-02-01 00:00:00", "2024-03-01 00:00:00")
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_set_paid() {
        let (db, patient) = setup_db();

        let mut visit = make_visit(&patient.id, 1);
        visit.is_free_visit = false;
        visit.paid = false;
        visit.charges = 30.0;
        db.insert_visit(&visit).unwrap();

        assert!(db.set_visit_paid(&visit.id).unwrap());
        let retrieved = db.get_visit(&visit.id).unwrap().unwrap();
        assert!(retrieved.paid);
    }

    #[test]
    fn test_delete_for_patient() {
        let (db, patient) = setup_db();

        db.insert_visit(&make_visit(&patient.id, 1)).unwrap();
        db.insert_visit(&make_visit(&patient.id, 2)).unwrap();

        assert_eq!(db.delete_visits_for_patient(&patient.id).unwrap(), 2);
        assert!(db.list_visits_for_patient(&patient.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_before_cutoff() {
        let (db, patient) = setup_db();
        let now = Utc::now();

        let mut old = make_visit(&patient.id, 1);
        old.created_at = (now - Duration::days(90)).to_rfc3339();
        db.insert_visit(&old).unwrap();
        db.insert_visit(&make_visit(&patient.id, 2)).unwrap();

        let cutoff = (now - Duration::days(30)).to_rfc3339();
        assert_eq!(db.delete_visits_before(&cutoff).unwrap(), 1);

        let remaining = db.list_visits_for_patient(&patient.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].visit_number, 2);
    }
}
