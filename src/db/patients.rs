//! Patient repository.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::ai::ClinicalFields;
use crate::error::{Result, ProntuError};
use super::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub practitioner_id: i64,
    pub first_name: String,
    pub second_name: Option<String>,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub objectives: String,
    pub clinical_demand: String,
    pub clinical_procedures: String,
    pub clinical_analysis: String,
    pub clinical_conclusion: String,
}

impl Patient {
    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            practitioner_id: row.get("practitioner_id")?,
            first_name: row.get("first_name")?,
            second_name: row.get("second_name")?,
            full_name: row.get("full_name")?,
            birth_date: row.get("birth_date")?,
            objectives: row.get("objectives")?,
            clinical_demand: row.get("clinical_demand")?,
            clinical_procedures: row.get("clinical_procedures")?,
            clinical_analysis: row.get("clinical_analysis")?,
            clinical_conclusion: row.get("clinical_conclusion")?,
        })
    }

    /// The five clinical fields as sent to the summarization call
    pub fn clinical_fields(&self) -> ClinicalFields {
        ClinicalFields {
            objectives: self.objectives.clone(),
            clinical_demand: self.clinical_demand.clone(),
            clinical_procedures: self.clinical_procedures.clone(),
            clinical_analysis: self.clinical_analysis.clone(),
            clinical_conclusion: self.clinical_conclusion.clone(),
        }
    }
}

/// Fields accepted when creating or updating a patient
#[derive(Debug, Clone, Deserialize)]
pub struct PatientInput {
    pub first_name: String,
    #[serde(default)]
    pub second_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub objectives: Option<String>,
    #[serde(default)]
    pub clinical_demand: Option<String>,
    #[serde(default)]
    pub clinical_procedures: Option<String>,
    #[serde(default)]
    pub clinical_analysis: Option<String>,
    #[serde(default)]
    pub clinical_conclusion: Option<String>,
}

impl PatientInput {
    /// Full name falls back to the name parts when not given explicitly
    fn resolved_full_name(&self) -> String {
        match &self.full_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => match &self.second_name {
                Some(second) if !second.trim().is_empty() => {
                    format!("{} {}", self.first_name.trim(), second.trim())
                }
                _ => self.first_name.trim().to_string(),
            },
        }
    }
}

/// Inserts a new patient and returns it.
pub fn insert(db: &Database, practitioner_id: i64, input: &PatientInput) -> Result<Patient> {
    let now = Utc::now().to_rfc3339();
    let full_name = input.resolved_full_name();

    let id = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO patients (practitioner_id, first_name, second_name, full_name,
             birth_date, objectives, clinical_demand, clinical_procedures, clinical_analysis,
             clinical_conclusion, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                practitioner_id,
                input.first_name.trim(),
                input.second_name,
                full_name,
                input.birth_date,
                input.objectives.clone().unwrap_or_default(),
                input.clinical_demand.clone().unwrap_or_default(),
                input.clinical_procedures.clone().unwrap_or_default(),
                input.clinical_analysis.clone().unwrap_or_default(),
                input.clinical_conclusion.clone().unwrap_or_default(),
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    get(db, practitioner_id, id)
}

/// Fetches one patient owned by the practitioner.
pub fn get(db: &Database, practitioner_id: i64, id: i64) -> Result<Patient> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM patients WHERE id = ?1 AND practitioner_id = ?2",
            params![id, practitioner_id],
            Patient::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                ProntuError::NotFound(format!("patient {}", id))
            }
            other => other.into(),
        })
    })
}

/// Lists the practitioner's patients ordered by full name.
pub fn list(db: &Database, practitioner_id: i64) -> Result<Vec<Patient>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM patients WHERE practitioner_id = ?1 ORDER BY full_name",
        )?;
        let patients = stmt
            .query_map(params![practitioner_id], Patient::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(patients)
    })
}

/// Overwrites the patient's editable fields.
pub fn update(db: &Database, practitioner_id: i64, id: i64, input: &PatientInput) -> Result<Patient> {
    let now = Utc::now().to_rfc3339();
    let full_name = input.resolved_full_name();

    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE patients SET first_name = ?3, second_name = ?4, full_name = ?5,
             birth_date = ?6, objectives = ?7, clinical_demand = ?8, clinical_procedures = ?9,
             clinical_analysis = ?10, clinical_conclusion = ?11, updated_at = ?12
             WHERE id = ?1 AND practitioner_id = ?2",
            params![
                id,
                practitioner_id,
                input.first_name.trim(),
                input.second_name,
                full_name,
                input.birth_date,
                input.objectives.clone().unwrap_or_default(),
                input.clinical_demand.clone().unwrap_or_default(),
                input.clinical_procedures.clone().unwrap_or_default(),
                input.clinical_analysis.clone().unwrap_or_default(),
                input.clinical_conclusion.clone().unwrap_or_default(),
                now,
            ],
        )?;
        Ok(changed)
    })?;

    if changed == 0 {
        return Err(ProntuError::NotFound(format!("patient {}", id)));
    }

    get(db, practitioner_id, id)
}

/// Field-scoped write used by the pipeline sink: only the five clinical
/// fields change.
pub fn update_clinical_fields(db: &Database, id: i64, fields: &ClinicalFields) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE patients SET objectives = ?2, clinical_demand = ?3,
             clinical_procedures = ?4, clinical_analysis = ?5, clinical_conclusion = ?6,
             updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                fields.objectives,
                fields.clinical_demand,
                fields.clinical_procedures,
                fields.clinical_analysis,
                fields.clinical_conclusion,
                now,
            ],
        )?;
        Ok(changed)
    })?;

    if changed == 0 {
        return Err(ProntuError::NotFound(format!("patient {}", id)));
    }

    Ok(())
}

/// Deletes a patient and, via foreign key cascade, their session records.
pub fn delete(db: &Database, practitioner_id: i64, id: i64) -> Result<()> {
    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM patients WHERE id = ?1 AND practitioner_id = ?2",
            params![id, practitioner_id],
        )?;
        Ok(changed)
    })?;

    if changed == 0 {
        return Err(ProntuError::NotFound(format!("patient {}", id)));
    }

    Ok(())
}
