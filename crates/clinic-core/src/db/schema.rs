//! SQLite schema definition.

/// Complete database schema for clinic-core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    id_card TEXT NOT NULL UNIQUE,                -- stored uppercase
    name TEXT NOT NULL,
    date_of_birth TEXT,
    category TEXT CHECK (category IN ('child', 'man', 'woman')),
    default_charge REAL NOT NULL DEFAULT 0,
    visit_count INTEGER NOT NULL DEFAULT 0,      -- lifetime total, never decremented
    is_active INTEGER NOT NULL DEFAULT 1,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_id_card ON patients(id_card);
CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at DESC);

-- ============================================================================
-- Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    visit_number INTEGER NOT NULL,               -- lifetime ordinal within the patient
    is_free_visit INTEGER NOT NULL DEFAULT 1,
    charges REAL NOT NULL DEFAULT 0,
    paid INTEGER NOT NULL DEFAULT 0,
    notes TEXT NOT NULL DEFAULT '',
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (patient_id, visit_number)
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id, visit_number);
CREATE INDEX IF NOT EXISTS idx_visits_created_at ON visits(created_at DESC);

-- ============================================================================
-- Timestamp maintenance
-- ============================================================================

CREATE TRIGGER IF NOT EXISTS patients_touch_updated_at
AFTER UPDATE ON patients
BEGIN
    UPDATE patients SET updated_at = datetime('now') WHERE id = NEW.id;
END;

CREATE TRIGGER IF NOT EXISTS visits_touch_updated_at
AFTER UPDATE ON visits
BEGIN
    UPDATE visits SET updated_at = datetime('now') WHERE id = NEW.id;
END;
"#;
