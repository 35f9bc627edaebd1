use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::db::patients::{self, PatientInput};
use super::{error_response, AppState, PRACTITIONER_ID};

pub async fn list_patients(State(state): State<AppState>) -> impl IntoResponse {
    match patients::list(&state.db, PRACTITIONER_ID) {
        Ok(list) => Json(list).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_patient(
    State(state): State<AppState>,
    Json(input): Json<PatientInput>,
) -> impl IntoResponse {
    if input.first_name.trim().is_empty() {
        return error_response(crate::error::ProntuError::InvalidInput(
            "first_name must not be empty".to_string(),
        ));
    }

    match patients::insert(&state.db, PRACTITIONER_ID, &input) {
        Ok(patient) => (StatusCode::CREATED, Json(patient)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match patients::get(&state.db, PRACTITIONER_ID, id) {
        Ok(patient) => Json(patient).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PatientInput>,
) -> impl IntoResponse {
    match patients::update(&state.db, PRACTITIONER_ID, id, &input) {
        Ok(patient) => Json(patient).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match patients::delete(&state.db, PRACTITIONER_ID, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
