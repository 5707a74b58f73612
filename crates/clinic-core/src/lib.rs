//! Clinic Core Library
//!
//! Patient and visit accounting for a small clinic: a monthly free-visit
//! quota, billing state derived at recording time, and age-based retention
//! of visit history.
//!
//! # Architecture
//!
//! ```text
//! record-visit request
//!         │
//!         ▼
//!   Visit Recorder ──── monthly count ───► Monthly Quota Evaluator
//!         │                                   (pure reads, injected clock)
//!         │ insert visit, bump counter
//!         ▼
//!    Patient Ledger ◄── create / update / delete / mark-paid / detail
//!         │
//!         ▼
//!      SQLite store ◄── Retention Sweeper (bulk purge, externally triggered)
//!                   ◄── Bulk Importer (row-isolated batch creation)
//! ```
//!
//! # Core Principle
//!
//! Two independent sequences per patient: the **lifetime ordinal** stored on
//! each visit row (`visit_number`, unique per patient, equal to the
//! patient's cumulative counter) and the **monthly count** used only for the
//! free-quota decision. They come from different queries and are never
//! merged. After a retention purge the counter intentionally exceeds the
//! surviving rows.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, Visit, quota summaries)
//! - [`quota`]: Monthly free-visit quota evaluation
//! - [`recorder`]: Visit recording
//! - [`ledger`]: Patient registration, mutation and read summaries
//! - [`retention`]: Age-based visit purge
//! - [`import`]: Bulk patient import

pub mod db;
pub mod import;
pub mod ledger;
pub mod models;
pub mod quota;
pub mod recorder;
pub mod retention;

// Re-export commonly used types
pub use db::Database;
pub use import::{BulkImporter, ImportRecord, ImportReport};
pub use ledger::{PatientDetail, PatientLedger, PatientPage};
pub use models::{
    NewPatient, Patient, PatientCategory, PatientUpdate, QuotaSummary, Visit,
};
pub use quota::{QuotaEvaluator, FREE_VISIT_LIMIT};
pub use recorder::VisitRecorder;
pub use retention::RetentionSweeper;

use db::DbError;

// =========================================================================
// Crate Error Type
// =========================================================================

/// Failure taxonomy surfaced to callers. The core performs no retries;
/// retrying is the caller's concern.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// A patient or visit id did not resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate id-card, or a visit ordinal lost a concurrent race.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation is meaningless in the entity's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A caller-supplied argument is out of range or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Underlying storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => ClinicError::NotFound(msg),
            DbError::Constraint(msg) => ClinicError::Conflict(msg),
            other => ClinicError::Database(other.to_string()),
        }
    }
}
