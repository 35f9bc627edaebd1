use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{self, Patient, SessionRecord};
use crate::error::{Result, ProntuError};
use crate::pipeline::{PipelineJob, PROCESSING_PLACEHOLDER};
use super::{error_response, AppState, PRACTITIONER_ID};

#[derive(Serialize)]
pub struct RecordResponse {
    pub record: SessionRecord,
    /// Present when an audio job was enqueued for the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    pub message: String,
}

#[derive(Deserialize)]
pub struct RecordUpdateInput {
    pub date: NaiveDate,
    pub content: String,
}

/// Fields read from the multipart upload form
struct UploadForm {
    date: Option<NaiveDate>,
    content: Option<String>,
    audio: Option<(Vec<u8>, String)>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm> {
    let mut form = UploadForm {
        date: None,
        content: None,
        audio: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProntuError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "date" => {
                let text = field.text().await.map_err(|e| {
                    ProntuError::InvalidInput(format!("Failed to read date field: {}", e))
                })?;
                if !text.trim().is_empty() {
                    let date = text.trim().parse::<NaiveDate>().map_err(|e| {
                        ProntuError::InvalidInput(format!("Invalid date '{}': {}", text, e))
                    })?;
                    form.date = Some(date);
                }
            }
            "content" => {
                form.content = Some(field.text().await.map_err(|e| {
                    ProntuError::InvalidInput(format!("Failed to read content field: {}", e))
                })?);
            }
            "audio" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    ProntuError::InvalidInput(format!("Failed to read audio field: {}", e))
                })?;
                debug!("Received audio upload: {} bytes, {}", data.len(), mime_type);
                if !data.is_empty() {
                    form.audio = Some((data.to_vec(), mime_type));
                }
            }
            other => {
                warn!("Ignoring unknown upload field '{}'", other);
            }
        }
    }

    Ok(form)
}

/// Build and submit the processing job for a record's audio
fn enqueue_audio_job(
    state: &AppState,
    patient: &Patient,
    record: &SessionRecord,
    audio: Vec<u8>,
    mime_type: String,
) -> Result<Uuid> {
    let practitioner = db::practitioners::get(&state.db, PRACTITIONER_ID)?;
    let model = practitioner
        .model
        .unwrap_or_else(|| state.config.ai.model.clone());

    state.pipeline.submit(PipelineJob {
        job_id: Uuid::new_v4(),
        record_id: record.id,
        patient_id: patient.id,
        audio,
        mime_type,
        api_key: practitioner.api_key,
        system_prompt: practitioner.system_prompt,
        model,
        prior_fields: patient.clinical_fields(),
        session_date: record.date,
    })
}

pub async fn list_records(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
) -> impl IntoResponse {
    // Ownership check before listing
    if let Err(e) = db::patients::get(&state.db, PRACTITIONER_ID, patient_id) {
        return error_response(e);
    }

    match db::records::list(&state.db, patient_id) {
        Ok(list) => Json(list).into_response(),
        Err(e) => error_response(e),
    }
}

/// Create a session record. With an audio part, the record starts as a
/// placeholder and the pipeline fills it in; without one, this is a plain
/// text-only creation.
pub async fn create_record(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let patient = match db::patients::get(&state.db, PRACTITIONER_ID, patient_id) {
        Ok(patient) => patient,
        Err(e) => return error_response(e),
    };

    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };

    let date = form.date.unwrap_or_else(|| Local::now().date_naive());

    match form.audio {
        Some((audio, mime_type)) => {
            let record =
                match db::records::insert(&state.db, patient.id, date, PROCESSING_PLACEHOLDER) {
                    Ok(record) => record,
                    Err(e) => return error_response(e),
                };

            match enqueue_audio_job(&state, &patient, &record, audio, mime_type) {
                Ok(job_id) => (
                    StatusCode::ACCEPTED,
                    Json(RecordResponse {
                        record,
                        job_id: Some(job_id),
                        message: "Audio processing started".to_string(),
                    }),
                )
                    .into_response(),
                Err(e) => {
                    // The placeholder row stays; reprocess can pick it up.
                    warn!("Failed to enqueue audio job for record {}: {}", record.id, e);
                    error_response(e)
                }
            }
        }
        None => {
            let content = form.content.unwrap_or_default();
            match db::records::insert(&state.db, patient.id, date, &content) {
                Ok(record) => (
                    StatusCode::CREATED,
                    Json(RecordResponse {
                        record,
                        job_id: None,
                        message: "Record created".to_string(),
                    }),
                )
                    .into_response(),
                Err(e) => error_response(e),
            }
        }
    }
}

pub async fn get_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    if let Err(e) = db::patients::get(&state.db, PRACTITIONER_ID, patient_id) {
        return error_response(e);
    }

    match db::records::get(&state.db, patient_id, record_id) {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e),
    }
}

/// Plain text edit of a record's date and content
pub async fn update_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(i64, i64)>,
    Json(input): Json<RecordUpdateInput>,
) -> impl IntoResponse {
    if let Err(e) = db::patients::get(&state.db, PRACTITIONER_ID, patient_id) {
        return error_response(e);
    }

    match db::records::update(&state.db, patient_id, record_id, input.date, &input.content) {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e),
    }
}

/// Re-run the pipeline for an existing record with newly uploaded audio
pub async fn reprocess_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(i64, i64)>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let patient = match db::patients::get(&state.db, PRACTITIONER_ID, patient_id) {
        Ok(patient) => patient,
        Err(e) => return error_response(e),
    };

    let record = match db::records::get(&state.db, patient_id, record_id) {
        Ok(record) => record,
        Err(e) => return error_response(e),
    };

    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };

    let Some((audio, mime_type)) = form.audio else {
        return error_response(ProntuError::InvalidInput(
            "Reprocessing requires an audio file".to_string(),
        ));
    };

    if let Err(e) = db::records::update_content(&state.db, record.id, PROCESSING_PLACEHOLDER) {
        return error_response(e);
    }

    match enqueue_audio_job(&state, &patient, &record, audio, mime_type) {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(RecordResponse {
                record,
                job_id: Some(job_id),
                message: "Audio reprocessing started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    if let Err(e) = db::patients::get(&state.db, PRACTITIONER_ID, patient_id) {
        return error_response(e);
    }

    match db::records::delete(&state.db, patient_id, record_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.pipeline.status(&job_id) {
        Some(info) => Json(info).into_response(),
        None => error_response(ProntuError::NotFound(format!("job {}", job_id))),
    }
}
