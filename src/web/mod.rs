// HTTP API surface
//
// JSON handlers over the store plus the audio upload/reprocess endpoints
// that feed the background pipeline. The service runs single-practice, so
// every request operates as the one seeded practitioner.

pub mod patients;
pub mod practitioner;
pub mod records;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::error::ProntuError;
use crate::pipeline::PipelineHandle;

/// Id of the seeded settings row
pub const PRACTITIONER_ID: i64 = 1;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub pipeline: PipelineHandle,
    pub config: Config,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map a pipeline/store error onto an HTTP response with a JSON body
pub(crate) fn error_response(e: ProntuError) -> Response {
    let status = match &e {
        ProntuError::NotFound(_) => StatusCode::NOT_FOUND,
        ProntuError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ProntuError::RecordBusy(_) => StatusCode::CONFLICT,
        ProntuError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/api/patients/{id}",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/api/patients/{patient_id}/records",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/api/patients/{patient_id}/records/{record_id}",
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        .route(
            "/api/patients/{patient_id}/records/{record_id}/reprocess",
            post(records::reprocess_record),
        )
        .route("/api/jobs/{job_id}", get(records::job_status))
        .route(
            "/api/practitioner",
            get(practitioner::get_practitioner).put(practitioner::update_practitioner),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
