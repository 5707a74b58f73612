//! Patient database operations.

use rusqlite::{params, OptionalExtension, ToSql};

use super::{map_constraint, Database, DbError, DbResult};
use crate::models::{Patient, PatientCategory, PatientUpdate};

const PATIENT_COLUMNS: &str = "id, id_card, name, date_of_birth, category, default_charge, \
                               visit_count, is_active, created_by, created_at, updated_at";

impl Database {
    /// Insert a new patient. A duplicate id-card surfaces as
    /// [`DbError::Constraint`].
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO patients (
                    id, id_card, name, date_of_birth, category, default_charge,
                    visit_count, is_active, created_by, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    patient.id,
                    patient.id_card,
                    patient.name,
                    patient.date_of_birth,
                    patient.category.map(|c| c.as_str()),
                    patient.default_charge,
                    patient.visit_count,
                    patient.is_active,
                    patient.created_by,
                    patient.created_at,
                    patient.updated_at,
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                map_patient_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Get a patient by id-card. Lookup is case-insensitive because the
    /// column is stored uppercase.
    pub fn get_patient_by_id_card(&self, id_card: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id_card = ?"),
                [id_card.to_uppercase()],
                map_patient_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// List patients newest first, optionally filtered by an id-card or name
    /// substring, with the total row count for pagination.
    pub fn list_patients(
        &self,
        offset: u32,
        limit: u32,
        search: Option<&str>,
    ) -> DbResult<(Vec<Patient>, i64)> {
        let (rows, total) = match search.filter(|s| !s.is_empty()) {
            Some(term) => {
                let pattern = format!("%{}%", term);
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients
                     WHERE id_card LIKE ?1 OR name LIKE ?1
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                ))?;
                let rows = stmt
                    .query_map(params![pattern, limit, offset], map_patient_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                let total: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM patients WHERE id_card LIKE ?1 OR name LIKE ?1",
                    [&pattern],
                    |row| row.get(0),
                )?;
                (rows, total)
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients
                     ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt
                    .query_map(params![limit, offset], map_patient_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                let total: i64 =
                    self.conn
                        .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
                (rows, total)
            }
        };

        let patients = rows
            .into_iter()
            .map(Patient::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((patients, total))
    }

    /// Apply a partial update. Absent fields are left untouched. Returns
    /// whether a row was changed (an all-absent update reports existence).
    pub fn update_patient_fields(&self, id: &str, update: &PatientUpdate) -> DbResult<bool> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = &update.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(dob) = &update.date_of_birth {
            sets.push("date_of_birth = ?");
            values.push(Box::new(dob.clone()));
        }
        if let Some(category) = &update.category {
            sets.push("category = ?");
            values.push(Box::new(category.map(|c| c.as_str().to_string())));
        }
        if let Some(charge) = update.default_charge {
            sets.push("default_charge = ?");
            values.push(Box::new(charge));
        }

        if sets.is_empty() {
            return Ok(self.get_patient(id)?.is_some());
        }

        values.push(Box::new(id.to_string()));
        let sql = format!("UPDATE patients SET {} WHERE id = ?", sets.join(", "));
        let params_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows_affected = self.conn.execute(&sql, params_refs.as_slice())?;
        Ok(rows_affected > 0)
    }

    /// Persist the lifetime visit counter after a recording.
    pub fn set_patient_visit_count(&self, id: &str, visit_count: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET visit_count = ?1 WHERE id = ?2",
            params![visit_count, id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a patient row. Visits are removed separately by the caller.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    id_card: String,
    name: String,
    date_of_birth: Option<String>,
    category: Option<String>,
    default_charge: f64,
    visit_count: i64,
    is_active: bool,
    created_by: String,
    created_at: String,
    updated_at: String,
}

fn map_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        id_card: row.get(1)?,
        name: row.get(2)?,
        date_of_birth: row.get(3)?,
        category: row.get(4)?,
        default_charge: row.get(5)?,
        visit_count: row.get(6)?,
        is_active: row.get(7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .as_deref()
            .map(|s| {
                PatientCategory::parse(s)
                    .ok_or_else(|| DbError::Constraint(format!("Unknown patient category: {}", s)))
            })
            .transpose()?;

        Ok(Patient {
            id: row.id,
            id_card: row.id_card,
            name: row.name,
            date_of_birth: row.date_of_birth,
            category,
            default_charge: row.default_charge,
            visit_count: row.visit_count,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
