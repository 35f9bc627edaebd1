use chrono::NaiveDate;
use tracing::{error, info};

use crate::ai::{ClinicalFields, ClinicalNote};
use crate::db::{self, Database};
use crate::error::Result;
use super::merge::merge_fields;

/// Content a record carries while its audio is still being processed
pub const PROCESSING_PLACEHOLDER: &str = "[Processing in background...]";

/// Marker prefixed to a record when its processing run fails
pub const FAILURE_PREFIX: &str = "⚠️ Falha no processamento do áudio:";

/// Writes pipeline outcomes into the patient and record rows. Two
/// field-scoped writes on success; one on failure.
pub struct RecordUpdateSink {
    db: Database,
}

impl RecordUpdateSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Apply a parsed note: the five patient fields get the locally merged
    /// additive values, the record content becomes the generated note text.
    pub fn apply_success(
        &self,
        patient_id: i64,
        record_id: i64,
        prior_fields: &ClinicalFields,
        note: &ClinicalNote,
        session_date: NaiveDate,
    ) -> Result<()> {
        let merged = merge_fields(prior_fields, note, session_date);
        db::patients::update_clinical_fields(&self.db, patient_id, &merged)?;

        db::records::update_content(&self.db, record_id, note.psy_record.trim())?;

        info!("Record {} updated with generated clinical note", record_id);
        Ok(())
    }

    /// Replace the record's placeholder with a failure marker. Patient
    /// fields are left untouched.
    pub fn apply_failure(&self, record_id: i64, detail: &str) {
        let content = format!("{} {}", FAILURE_PREFIX, detail);
        if let Err(e) = db::records::update_content(&self.db, record_id, &content) {
            error!("Failed to write failure marker to record {}: {}", record_id, e);
        }
    }
}
