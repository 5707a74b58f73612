//! Visit recording.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::{Database, DbError};
use crate::models::{QuotaSummary, Visit};
use crate::quota::{remaining_free_visits, QuotaEvaluator, FREE_VISIT_LIMIT};
use crate::{ClinicError, ClinicResult};

/// Records visits and keeps the patient's lifetime counter in step.
pub struct VisitRecorder<'a> {
    db: &'a Database,
}

impl<'a> VisitRecorder<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a visit for a patient.
    ///
    /// The monthly ordinal (free-quota decision) and the lifetime ordinal
    /// (stored `visit_number`) come from different queries and are
    /// deliberately independent sequences. The first [`FREE_VISIT_LIMIT`]
    /// visits in a calendar month are free, zero-charge and already paid;
    /// later visits are billable and start unpaid, charged the requested
    /// amount or the patient's default.
    ///
    /// The read-then-write sequence is not wrapped in a transaction. Two
    /// concurrent recordings for the same patient can compute the same
    /// lifetime ordinal; the `(patient_id, visit_number)` unique index
    /// rejects the second insert and this returns [`ClinicError::Conflict`].
    pub fn record_visit(
        &self,
        patient_id: &str,
        requested_charge: Option<f64>,
        notes: Option<&str>,
        recorded_by: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<(Visit, QuotaSummary)> {
        let patient = self
            .db
            .get_patient(patient_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", patient_id)))?;

        let evaluator = QuotaEvaluator::new(self.db);
        let monthly_visit_number = evaluator.count_current_month(patient_id, now)? + 1;
        let total_visit_number = patient.visit_count + 1;

        let is_free_visit = monthly_visit_number <= FREE_VISIT_LIMIT;
        let charges = if is_free_visit {
            0.0
        } else {
            requested_charge.unwrap_or(patient.default_charge)
        };

        let visit = Visit::new(
            patient.id.clone(),
            total_visit_number,
            is_free_visit,
            charges,
            notes.unwrap_or_default().to_string(),
            recorded_by.to_string(),
            now,
        );

        self.db.insert_visit(&visit).map_err(|e| match e {
            DbError::Constraint(msg) => {
                warn!(
                    patient_id = %patient.id,
                    visit_number = total_visit_number,
                    "visit number already taken, concurrent recording lost"
                );
                ClinicError::Conflict(msg)
            }
            other => other.into(),
        })?;
        self.db
            .set_patient_visit_count(&patient.id, total_visit_number)?;

        info!(
            patient_id = %patient.id,
            visit_number = total_visit_number,
            monthly_visit_number,
            free = is_free_visit,
            "visit recorded"
        );

        let summary = QuotaSummary {
            visit_count: total_visit_number,
            monthly_visit_count: monthly_visit_number,
            remaining_free_visits: remaining_free_visits(monthly_visit_number),
        };
        Ok((visit, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPatient, Patient};

    fn setup() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let mut patient = Patient::new("AB-12".into(), "Nour".into(), "u1".into());
        patient.default_charge = 20.0;
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    #[test]
    fn test_unknown_patient_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let recorder = VisitRecorder::new(&db);

        let result = recorder.record_visit("no-such-id", None, None, "u1", Utc::now());
        assert!(matches!(result, Err(ClinicError::NotFound(_))));
    }

    #[test]
    fn test_first_visit_is_free_and_counted() {
        let (db, patient) = setup();
        let recorder = VisitRecorder::new(&db);

        let (visit, summary) = recorder
            .record_visit(&patient.id, Some(50.0), Some("checkup"), "u1", Utc::now())
            .unwrap();

        assert_eq!(visit.visit_number, 1);
        assert!(visit.is_free_visit);
        assert_eq!(visit.charges, 0.0);
        assert!(visit.paid);
        assert_eq!(visit.notes, "checkup");

        assert_eq!(summary.visit_count, 1);
        assert_eq!(summary.monthly_visit_count, 1);
        assert_eq!(summary.remaining_free_visits, 2);

        let stored = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(stored.visit_count, 1);
    }

    #[test]
    fn test_fourth_visit_uses_requested_charge() {
        let (db, patient) = setup();
        let recorder = VisitRecorder::new(&db);
        let now = Utc::now();

        for _ in 0..3 {
            recorder
                .record_visit(&patient.id, None, None, "u1", now)
                .unwrap();
        }
        let (visit, summary) = recorder
            .record_visit(&patient.id, Some(75.0), None, "u1", now)
            .unwrap();

        assert!(!visit.is_free_visit);
        assert!(!visit.paid);
        assert_eq!(visit.charges, 75.0);
        assert_eq!(summary.remaining_free_visits, 0);
    }

    #[test]
    fn test_billable_visit_falls_back_to_default_charge() {
        let (db, patient) = setup();
        let recorder = VisitRecorder::new(&db);
        let now = Utc::now();

        for _ in 0..3 {
            recorder
                .record_visit(&patient.id, None, None, "u1", now)
                .unwrap();
        }
        let (visit, _) = recorder
            .record_visit(&patient.id, None, None, "u1", now)
            .unwrap();

        assert_eq!(visit.charges, 20.0); // patient default
    }

    #[test]
    fn test_lifetime_ordinal_is_independent_of_month() {
        // A seeded counter keeps growing even though the monthly count
        // starts from zero for the current month.
        let db = Database::open_in_memory().unwrap();
        let new = NewPatient {
            id_card: "AB-99".into(),
            name: "Seeded".into(),
            date_of_birth: None,
            category: None,
            default_charge: 0.0,
            visit_count: 41,
        };
        let ledger = crate::ledger::PatientLedger::new(&db);
        let patient = ledger.create_patient(new, "u1").unwrap();

        let recorder = VisitRecorder::new(&db);
        let (visit, summary) = recorder
            .record_visit(&patient.id, None, None, "u1", Utc::now())
            .unwrap();

        assert_eq!(visit.visit_number, 42);
        assert_eq!(summary.monthly_visit_count, 1);
        assert!(visit.is_free_visit);
    }

    #[test]
    fn test_stale_counter_conflict() {
        // Simulates the concurrent-recording race: the counter lags behind
        // an existing row, so the next insert collides on the ordinal.
        let (db, patient) = setup();
        let recorder = VisitRecorder::new(&db);

        recorder
            .record_visit(&patient.id, None, None, "u1", Utc::now())
            .unwrap();
        db.set_patient_visit_count(&patient.id, 0).unwrap();

        let result = recorder.record_visit(&patient.id, None, None, "u1", Utc::now());
        assert!(matches!(result, Err(ClinicError::Conflict(_))));
    }
}
