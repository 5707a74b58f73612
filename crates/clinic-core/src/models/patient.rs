//! Patient models.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Patient category used for billing reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatientCategory {
    Child,
    Man,
    Woman,
}

impl PatientCategory {
    /// Storage representation (lowercase TEXT column).
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientCategory::Child => "child",
            PatientCategory::Man => "man",
            PatientCategory::Woman => "woman",
        }
    }

    /// Parse a category, case-insensitively. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "child" => Some(PatientCategory::Child),
            "man" => Some(PatientCategory::Man),
            "woman" => Some(PatientCategory::Woman),
            _ => None,
        }
    }
}

/// A registered clinic patient.
///
/// `visit_count` is the lifetime total of recorded visits. It is bumped by
/// the visit recorder and never decremented; after a retention purge it will
/// exceed the number of surviving visit rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Generated UUID
    pub id: String,
    /// Identity card number, unique, stored uppercase
    pub id_card: String,
    /// Display name
    pub name: String,
    /// Date of birth (free-form, as supplied)
    pub date_of_birth: Option<String>,
    /// Billing category
    pub category: Option<PatientCategory>,
    /// Default per-visit charge for billable visits
    pub default_charge: f64,
    /// Lifetime visit counter (monotonic)
    pub visit_count: i64,
    /// Active flag
    pub is_active: bool,
    /// Actor who created the record
    pub created_by: String,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields. The id-card is normalized
    /// to uppercase.
    pub fn new(id_card: String, name: String, created_by: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            id_card: id_card.to_uppercase(),
            name,
            date_of_birth: None,
            category: None,
            default_charge: 0.0,
            visit_count: 0,
            is_active: true,
            created_by,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Fields accepted when registering a patient.
///
/// Callers are expected to have validated these already; only the duplicate
/// id-card check happens at this layer. `visit_count` seeds the lifetime
/// counter for migrated records and creates no visit rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub id_card: String,
    pub name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub category: Option<PatientCategory>,
    #[serde(default)]
    pub default_charge: f64,
    #[serde(default)]
    pub visit_count: i64,
}

/// Partial patient update. `None` leaves a field untouched; for the
/// clearable fields the inner `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub date_of_birth: Option<Option<String>>,
    pub category: Option<Option<PatientCategory>>,
    pub default_charge: Option<f64>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_of_birth.is_none()
            && self.category.is_none()
            && self.default_charge.is_none()
    }
}
