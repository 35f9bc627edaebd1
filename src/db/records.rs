//! Session record ("prontuário") repository.
//!
//! Record numbers are sequential per patient, assigned at creation as
//! max(existing) + 1 inside the insert transaction, and unique per patient
//! at the schema level.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ProntuError};
use super::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub patient_id: i64,
    pub record_number: i64,
    pub date: NaiveDate,
    pub content: String,
}

impl SessionRecord {
    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            record_number: row.get("record_number")?,
            date: row.get("date")?,
            content: row.get("content")?,
        })
    }
}

/// Inserts a new record for the patient, assigning the next sequential
/// number, and returns it.
pub fn insert(db: &Database, patient_id: i64, date: NaiveDate, content: &str) -> Result<SessionRecord> {
    let now = Utc::now().to_rfc3339();

    let id = db.with_conn(|conn| {
        // Number assignment and insert under one transaction so interleaved
        // creations for the same patient cannot claim the same number.
        let tx = conn.unchecked_transaction()?;

        let next_number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(record_number), 0) + 1 FROM session_records WHERE patient_id = ?1",
            params![patient_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO session_records (patient_id, record_number, date, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![patient_id, next_number, date, content, now],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    })?;

    get(db, patient_id, id)
}

/// Fetches one record of the patient.
pub fn get(db: &Database, patient_id: i64, id: i64) -> Result<SessionRecord> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM session_records WHERE id = ?1 AND patient_id = ?2",
            params![id, patient_id],
            SessionRecord::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                ProntuError::NotFound(format!("record {}", id))
            }
            other => other.into(),
        })
    })
}

/// Lists the patient's records in number order.
pub fn list(db: &Database, patient_id: i64) -> Result<Vec<SessionRecord>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM session_records WHERE patient_id = ?1 ORDER BY record_number",
        )?;
        let records = stmt
            .query_map(params![patient_id], SessionRecord::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    })
}

/// Overwrites the record's date and content.
pub fn update(db: &Database, patient_id: i64, id: i64, date: NaiveDate, content: &str) -> Result<SessionRecord> {
    let now = Utc::now().to_rfc3339();

    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE session_records SET date = ?3, content = ?4, updated_at = ?5
             WHERE id = ?1 AND patient_id = ?2",
            params![id, patient_id, date, content, now],
        )?;
        Ok(changed)
    })?;

    if changed == 0 {
        return Err(ProntuError::NotFound(format!("record {}", id)));
    }

    get(db, patient_id, id)
}

/// Field-scoped write used by the pipeline sink: only the content changes.
pub fn update_content(db: &Database, id: i64, content: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE session_records SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, content, now],
        )?;
        Ok(changed)
    })?;

    if changed == 0 {
        return Err(ProntuError::NotFound(format!("record {}", id)));
    }

    Ok(())
}

/// Deletes a record. Numbers of the remaining records are not compacted.
pub fn delete(db: &Database, patient_id: i64, id: i64) -> Result<()> {
    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM session_records WHERE id = ?1 AND patient_id = ?2",
            params![id, patient_id],
        )?;
        Ok(changed)
    })?;

    if changed == 0 {
        return Err(ProntuError::NotFound(format!("record {}", id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{patients, practitioners};
    use crate::db::patients::PatientInput;

    fn test_patient(db: &Database, name: &str) -> i64 {
        let practitioner = practitioners::ensure_default(db, "prompt").unwrap();
        patients::insert(
            db,
            practitioner.id,
            &PatientInput {
                first_name: name.to_string(),
                second_name: None,
                full_name: None,
                birth_date: NaiveDate::from_ymd_opt(1985, 1, 2).unwrap(),
                objectives: None,
                clinical_demand: None,
                clinical_procedures: None,
                clinical_analysis: None,
                clinical_conclusion: None,
            },
        )
        .unwrap()
        .id
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    }

    #[test]
    fn test_sequential_numbering_per_patient() {
        let db = Database::open_in_memory().unwrap();
        let ana = test_patient(&db, "Ana");
        let bruno = test_patient(&db, "Bruno");

        // Interleave creations across patients; numbering stays per patient.
        let a1 = insert(&db, ana, today(), "primeira").unwrap();
        let b1 = insert(&db, bruno, today(), "primeira").unwrap();
        let a2 = insert(&db, ana, today(), "segunda").unwrap();
        let b2 = insert(&db, bruno, today(), "segunda").unwrap();
        let a3 = insert(&db, ana, today(), "terceira").unwrap();

        assert_eq!((a1.record_number, a2.record_number, a3.record_number), (1, 2, 3));
        assert_eq!((b1.record_number, b2.record_number), (1, 2));
    }

    #[test]
    fn test_numbering_not_reused_after_delete_of_middle() {
        let db = Database::open_in_memory().unwrap();
        let ana = test_patient(&db, "Ana");

        insert(&db, ana, today(), "um").unwrap();
        let second = insert(&db, ana, today(), "dois").unwrap();
        let third = insert(&db, ana, today(), "três").unwrap();

        delete(&db, ana, second.id).unwrap();
        let fourth = insert(&db, ana, today(), "quatro").unwrap();

        assert_eq!(third.record_number, 3);
        assert_eq!(fourth.record_number, 4);
    }

    #[test]
    fn test_update_content_only_touches_content() {
        let db = Database::open_in_memory().unwrap();
        let ana = test_patient(&db, "Ana");
        let record = insert(&db, ana, today(), "[placeholder]").unwrap();

        update_content(&db, record.id, "nota final").unwrap();

        let reloaded = get(&db, ana, record.id).unwrap();
        assert_eq!(reloaded.content, "nota final");
        assert_eq!(reloaded.date, today());
        assert_eq!(reloaded.record_number, record.record_number);
    }

    #[test]
    fn test_get_missing_record_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let ana = test_patient(&db, "Ana");

        let result = get(&db, ana, 999);
        assert!(matches!(result, Err(ProntuError::NotFound(_))));
    }
}
