//! Patient ledger: registration, mutation, deletion and read summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::models::{NewPatient, Patient, PatientUpdate, Visit};
use crate::quota::{remaining_free_visits, QuotaEvaluator};
use crate::{ClinicError, ClinicResult};

/// Patient detail view: the record plus its visit history and the current
/// month's quota position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    pub patient: Patient,
    /// All surviving visits, most recent ordinal first
    pub visits: Vec<Visit>,
    /// Visits inside the current calendar month, oldest first
    pub current_month_visits: Vec<Visit>,
    pub monthly_visit_count: i64,
    pub remaining_free_visits_this_month: i64,
}

/// One page of the patient listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: i64,
}

/// Owns patient identity and billing state.
pub struct PatientLedger<'a> {
    db: &'a Database,
}

impl<'a> PatientLedger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a patient. The id-card is normalized to uppercase; a
    /// duplicate returns [`ClinicError::Conflict`]. `visit_count` seeds the
    /// lifetime counter (migration path) and creates no visit rows.
    pub fn create_patient(&self, new: NewPatient, created_by: &str) -> ClinicResult<Patient> {
        if self.db.get_patient_by_id_card(&new.id_card)?.is_some() {
            return Err(ClinicError::Conflict(format!(
                "patient with id card {} already exists",
                new.id_card.to_uppercase()
            )));
        }

        let mut patient = Patient::new(new.id_card, new.name, created_by.to_string());
        patient.date_of_birth = new.date_of_birth;
        patient.category = new.category;
        patient.default_charge = new.default_charge;
        patient.visit_count = new.visit_count;

        // The unique index still backstops a concurrent create
        self.db.insert_patient(&patient)?;
        info!(patient_id = %patient.id, id_card = %patient.id_card, "patient created");
        Ok(patient)
    }

    /// Get a patient by ID, or NotFound.
    pub fn get_patient(&self, id: &str) -> ClinicResult<Patient> {
        self.db
            .get_patient(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", id)))
    }

    /// Look a patient up by id-card (case-insensitive).
    pub fn find_by_id_card(&self, id_card: &str) -> ClinicResult<Option<Patient>> {
        Ok(self.db.get_patient_by_id_card(id_card)?)
    }

    /// Paginated listing, newest first, optional id-card/name search.
    /// Pages are 1-based.
    pub fn list_patients(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> ClinicResult<PatientPage> {
        if page < 1 || limit < 1 {
            return Err(ClinicError::InvalidArgument(
                "page and limit must be at least 1".into(),
            ));
        }

        let offset = (page - 1) * limit;
        let (patients, total) = self.db.list_patients(offset, limit, search)?;
        let pages = (total + i64::from(limit) - 1) / i64::from(limit);

        Ok(PatientPage {
            patients,
            total,
            page,
            limit,
            pages,
        })
    }

    /// Apply a partial update; absent fields stay untouched.
    pub fn update_patient(&self, id: &str, update: &PatientUpdate) -> ClinicResult<Patient> {
        if update.is_empty() {
            return self.get_patient(id);
        }
        if !self.db.update_patient_fields(id, update)? {
            return Err(ClinicError::NotFound(format!("patient {}", id)));
        }
        self.get_patient(id)
    }

    /// Mark a billable visit as paid. Paying an already-paid visit is
    /// rejected without a write, so `updated_at` is untouched.
    pub fn mark_visit_paid(&self, visit_id: &str) -> ClinicResult<Visit> {
        let visit = self
            .db
            .get_visit(visit_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("visit {}", visit_id)))?;

        if visit.paid {
            return Err(ClinicError::InvalidState(format!(
                "visit {} is already marked as paid",
                visit_id
            )));
        }

        self.db.set_visit_paid(visit_id)?;
        info!(visit_id = %visit_id, "visit marked as paid");
        self.db
            .get_visit(visit_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("visit {}", visit_id)))
    }

    /// Delete a patient and all of its visits. Two statements, matching the
    /// storage layer's cascade; there is no surrounding transaction.
    pub fn delete_patient(&self, id: &str) -> ClinicResult<()> {
        if self.db.get_patient(id)?.is_none() {
            return Err(ClinicError::NotFound(format!("patient {}", id)));
        }

        let visits_deleted = self.db.delete_visits_for_patient(id)?;
        self.db.delete_patient(id)?;
        info!(patient_id = %id, visits_deleted, "patient deleted");
        Ok(())
    }

    /// Detail view with full history and the current month's quota position.
    pub fn patient_detail(&self, id: &str, now: DateTime<Utc>) -> ClinicResult<PatientDetail> {
        let patient = self.get_patient(id)?;
        let visits = self.db.list_visits_for_patient(id)?;

        let evaluator = QuotaEvaluator::new(self.db);
        let current_month_visits = evaluator.list_current_month(id, now)?;
        let monthly_visit_count = current_month_visits.len() as i64;

        Ok(PatientDetail {
            patient,
            visits,
            current_month_visits,
            monthly_visit_count,
            remaining_free_visits_this_month: remaining_free_visits(monthly_visit_count),
        })
    }
}
