//! Age-based retention sweep over visit records.

use chrono::{DateTime, Months, Utc};
use tracing::info;

use crate::db::Database;
use crate::{ClinicError, ClinicResult};

/// Bulk-deletes visit records older than a calendar-month threshold.
///
/// Purging never adjusts any patient's `visit_count`: the counter stays the
/// lifetime total while visit rows become the recent window only. That
/// divergence is part of the contract, not a bug to reconcile.
pub struct RetentionSweeper<'a> {
    db: &'a Database,
}

impl<'a> RetentionSweeper<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete every visit created strictly before `now - months_old`
    /// calendar months, across all patients. Returns the deleted count.
    pub fn purge_visits_older_than(
        &self,
        months_old: u32,
        now: DateTime<Utc>,
    ) -> ClinicResult<usize> {
        if months_old < 1 {
            return Err(ClinicError::InvalidArgument(
                "months_old must be at least 1".into(),
            ));
        }

        let cutoff = now
            .checked_sub_months(Months::new(months_old))
            .ok_or_else(|| {
                ClinicError::InvalidArgument(format!(
                    "cutoff {} months before {} is out of range",
                    months_old, now
                ))
            })?;

        let deleted = self.db.delete_visits_before(&cutoff.to_rfc3339())?;
        info!(deleted, months_old, "purged old visit records");
        Ok(deleted)
    }
}
