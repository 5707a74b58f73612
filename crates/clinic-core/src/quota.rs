//! Monthly free-visit quota evaluation.
//!
//! The quota window is the calendar month containing the supplied clock
//! value, half-open: `[first day of month, first day of next month)`. The
//! clock is always an explicit parameter so the evaluator stays
//! deterministic under test.

use chrono::{DateTime, Datelike, Utc};

use crate::db::Database;
use crate::models::Visit;
use crate::ClinicResult;

/// Number of no-charge visits each patient gets per calendar month.
pub const FREE_VISIT_LIMIT: i64 = 3;

/// Free visits left after `monthly_count` visits this month; never negative.
pub fn remaining_free_visits(monthly_count: i64) -> i64 {
    (FREE_VISIT_LIMIT - monthly_count).max(0)
}

/// Half-open calendar-month window containing `now`, as SQLite datetime
/// strings. Day 1 of a month always exists, so this is pure string math.
pub fn month_window(now: DateTime<Utc>) -> (String, String) {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    (month_start(year, month), month_start(next_year, next_month))
}

fn month_start(year: i32, month: u32) -> String {
    format!("{:04}-{:02}-01 00:00:00", year, month)
}

/// Read-side evaluator for the monthly quota. Pure queries, no side effects.
pub struct QuotaEvaluator<'a> {
    db: &'a Database,
}

impl<'a> QuotaEvaluator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Count the patient's visits in the calendar month containing `now`.
    pub fn count_current_month(&self, patient_id: &str, now: DateTime<Utc>) -> ClinicResult<i64> {
        let (start, end) = month_window(now);
        Ok(self.db.count_visits_in_window(patient_id, &start, &end)?)
    }

    /// List the patient's visits in the calendar month containing `now`,
    /// oldest first.
    pub fn list_current_month(
        &self,
        patient_id: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<Vec<Visit>> {
        let (start, end) = month_window(now);
        Ok(self.db.list_visits_in_window(patient_id, &start, &end)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_month_window_mid_month() {
        let (start, end) = month_window(at("2024-03-15T12:30:00Z"));
        assert_eq!(start, "2024-03-01 00:00:00");
        assert_eq!(end, "2024-04-01 00:00:00");
    }

    #[test]
    fn test_month_window_december_rollover() {
        let (start, end) = month_window(at("2023-12-31T23:59:59Z"));
        assert_eq!(start, "2023-12-01 00:00:00");
        assert_eq!(end, "2024-01-01 00:00:00");
    }

    #[test]
    fn test_remaining_free_visits_floor() {
        assert_eq!(remaining_free_visits(0), 3);
        assert_eq!(remaining_free_visits(2), 1);
        assert_eq!(remaining_free_visits(3), 0);
        assert_eq!(remaining_free_visits(7), 0);
    }

    #[test]
    fn test_count_excludes_previous_month() {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("AB-12".into(), "Nour".into(), "u1".into());
        db.insert_patient(&patient).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let last_month = Utc.with_ymd_and_hms(2024, 2, 28, 10, 0, 0).unwrap();

        let mk = |number: i64, when: DateTime<Utc>| {
            Visit::new(
                patient.id.clone(),
                number,
                true,
                0.0,
                String::new(),
                "u1".into(),
                when,
            )
        };
        db.insert_visit(&mk(1, last_month)).unwrap();
        db.insert_visit(&mk(2, now)).unwrap();
        db.insert_visit(&mk(3, now)).unwrap();

        let evaluator = QuotaEvaluator::new(&db);
        assert_eq!(evaluator.count_current_month(&patient.id, now).unwrap(), 2);

        let listed = evaluator.list_current_month(&patient.id, now).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|v| v.visit_number != 1));
    }
}
