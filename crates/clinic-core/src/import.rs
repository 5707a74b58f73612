//! Bulk patient import.
//!
//! Each input row is processed independently: a malformed or duplicate row
//! is reported with its original index and never aborts the batch.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::models::{Patient, PatientCategory};
use crate::{ClinicError, ClinicResult};

/// One raw import row. Everything is optional at the parse stage so a row
/// with missing fields fails validation individually instead of failing the
/// whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub id_card: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub default_charge: Option<f64>,
    #[serde(default)]
    pub visit_count: Option<i64>,
}

/// Successfully imported row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedRow {
    pub index: usize,
    pub id: String,
    pub id_card: String,
    pub name: String,
}

/// Rejected row with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRow {
    pub index: usize,
    pub id_card: String,
    pub name: String,
    pub error: String,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: Vec<ImportedRow>,
    pub failed: Vec<FailedRow>,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

/// Validated row fields, ready to become a patient.
#[derive(Debug)]
struct ValidRecord {
    id_card: String,
    name: String,
    date_of_birth: Option<String>,
    category: Option<PatientCategory>,
    default_charge: f64,
    visit_count: i64,
}

/// Imports patient batches.
pub struct BulkImporter<'a> {
    db: &'a Database,
}

impl<'a> BulkImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Import a batch of records. An empty batch is an error; individual
    /// row failures are collected into the report. Imported `visit_count`
    /// values seed the lifetime counter only; no visit rows are synthesized.
    pub fn import(&self, records: &[ImportRecord], created_by: &str) -> ClinicResult<ImportReport> {
        if records.is_empty() {
            return Err(ClinicError::InvalidArgument(
                "import batch must contain at least one record".into(),
            ));
        }

        let mut report = ImportReport {
            success: Vec::new(),
            failed: Vec::new(),
            total: records.len(),
            success_count: 0,
            failed_count: 0,
        };

        for (index, record) in records.iter().enumerate() {
            match self.import_one(record, created_by) {
                Ok(patient) => {
                    report.success.push(ImportedRow {
                        index,
                        id: patient.id,
                        id_card: patient.id_card,
                        name: patient.name,
                    });
                    report.success_count += 1;
                }
                Err(error) => {
                    report.failed.push(FailedRow {
                        index,
                        id_card: record.id_card.clone().unwrap_or_else(|| "N/A".into()),
                        name: record.name.clone().unwrap_or_else(|| "N/A".into()),
                        error,
                    });
                    report.failed_count += 1;
                }
            }
        }

        info!(
            total = report.total,
            succeeded = report.success_count,
            failed = report.failed_count,
            "bulk import completed"
        );
        Ok(report)
    }

    /// Import from a JSON array of records. A payload that fails to parse
    /// is an [`ClinicError::InvalidArgument`].
    pub fn import_json(&self, json: &str, created_by: &str) -> ClinicResult<ImportReport> {
        let records: Vec<ImportRecord> = serde_json::from_str(json)
            .map_err(|e| ClinicError::InvalidArgument(format!("invalid import payload: {}", e)))?;
        self.import(&records, created_by)
    }

    fn import_one(&self, record: &ImportRecord, created_by: &str) -> Result<Patient, String> {
        let valid = validate_record(record)?;

        // Catches both pre-existing patients and earlier rows in this batch
        let existing = self
            .db
            .get_patient_by_id_card(&valid.id_card)
            .map_err(|e| e.to_string())?;
        if existing.is_some() {
            return Err(format!(
                "patient with id card {} already exists",
                valid.id_card.to_uppercase()
            ));
        }

        let mut patient = Patient::new(valid.id_card, valid.name, created_by.to_string());
        patient.date_of_birth = valid.date_of_birth;
        patient.category = valid.category;
        patient.default_charge = valid.default_charge;
        patient.visit_count = valid.visit_count;

        self.db.insert_patient(&patient).map_err(|e| e.to_string())?;
        Ok(patient)
    }
}

fn validate_record(record: &ImportRecord) -> Result<ValidRecord, String> {
    let id_card = record
        .id_card
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("id_card is required and must be a non-empty string")?;
    if id_card.len() > 50 {
        return Err("id_card must be between 1 and 50 characters".into());
    }

    let name = record
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("name is required and must be a non-empty string")?;
    if name.len() < 2 || name.len() > 100 {
        return Err("name must be between 2 and 100 characters".into());
    }

    let date_of_birth = record
        .date_of_birth
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let category = record
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            PatientCategory::parse(s).ok_or("category must be one of: child, man, woman")
        })
        .transpose()?;

    let default_charge = record.default_charge.unwrap_or(0.0);
    if !default_charge.is_finite() || default_charge < 0.0 {
        return Err("default_charge must be a non-negative number".into());
    }

    let visit_count = record.visit_count.unwrap_or(0);
    if visit_count < 0 {
        return Err("visit_count must be a non-negative integer".into());
    }

    Ok(ValidRecord {
        id_card: id_card.to_string(),
        name: name.to_string(),
        date_of_birth,
        category,
        default_charge,
        visit_count,
    })
}
