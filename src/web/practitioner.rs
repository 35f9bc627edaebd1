use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::db::practitioners::{self, Practitioner, PractitionerInput};
use super::{error_response, AppState, PRACTITIONER_ID};

/// Settings as returned over the API. The stored credential is never echoed
/// back in full.
#[derive(Serialize)]
pub struct PractitionerView {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub api_key_set: bool,
    pub system_prompt: String,
    pub model: Option<String>,
}

impl From<Practitioner> for PractitionerView {
    fn from(practitioner: Practitioner) -> Self {
        Self {
            id: practitioner.id,
            name: practitioner.name,
            api_key: mask_api_key(&practitioner.api_key),
            api_key_set: !practitioner.api_key.is_empty(),
            system_prompt: practitioner.system_prompt,
            model: practitioner.model,
        }
    }
}

/// Keep only the last four characters visible
fn mask_api_key(api_key: &str) -> String {
    if api_key.is_empty() {
        return String::new();
    }

    let visible: String = api_key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    format!("••••{}", visible)
}

pub async fn get_practitioner(State(state): State<AppState>) -> impl IntoResponse {
    match practitioners::get(&state.db, PRACTITIONER_ID) {
        Ok(practitioner) => Json(PractitionerView::from(practitioner)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_practitioner(
    State(state): State<AppState>,
    Json(input): Json<PractitionerInput>,
) -> impl IntoResponse {
    match practitioners::update(&state.db, PRACTITIONER_ID, &input) {
        Ok(practitioner) => Json(PractitionerView::from(practitioner)).into_response(),
        Err(e) => error_response(e),
    }
}
