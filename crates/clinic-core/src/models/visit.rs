//! Visit models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded visit.
///
/// `visit_number` is the patient's lifetime ordinal at the time of
/// recording, unique per patient. It is not the monthly ordinal used for
/// the free-quota decision; the two sequences are independent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Generated UUID
    pub id: String,
    /// Owning patient ID
    pub patient_id: String,
    /// Lifetime ordinal, unique within the patient
    pub visit_number: i64,
    /// Whether this visit fell inside the monthly free quota
    pub is_free_visit: bool,
    /// Charge for this visit; always zero when free
    pub charges: f64,
    /// Payment status; free visits start paid
    pub paid: bool,
    /// Free-text notes
    pub notes: String,
    /// Actor who recorded the visit
    pub created_by: String,
    /// Recording timestamp (RFC3339); drives monthly windowing and retention
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Visit {
    /// Build a visit row. `recorded_at` is supplied by the caller so the
    /// stored timestamp matches the clock the quota decision was made with.
    pub fn new(
        patient_id: String,
        visit_number: i64,
        is_free_visit: bool,
        charges: f64,
        notes: String,
        created_by: String,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let now = recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            visit_number,
            is_free_visit,
            charges: if is_free_visit { 0.0 } else { charges },
            paid: is_free_visit,
            notes,
            created_by,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Quota summary returned alongside a freshly recorded visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaSummary {
    /// Updated lifetime visit count
    pub visit_count: i64,
    /// Monthly ordinal of the visit just recorded
    pub monthly_visit_count: i64,
    /// Free visits left this calendar month (never negative)
    pub remaining_free_visits: i64,
}
