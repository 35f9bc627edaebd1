use std::sync::Arc;
use tracing::info;

use crate::error::{Result, ProntuError};
use super::{ClinicalFields, GenerativeClient, GenerativePart};
use super::prompts::SUMMARY_RESPONSE_CONTRACT;

/// Sends the transcript plus the patient's prior clinical fields to the
/// remote service and returns the raw response text, expected to contain
/// the six-key JSON object.
pub struct Summarizer {
    client: Arc<dyn GenerativeClient>,
}

impl Summarizer {
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self { client }
    }

    pub async fn summarize(
        &self,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        prior_fields: &ClinicalFields,
        transcript: &str,
    ) -> Result<String> {
        let prompt = build_summary_prompt(system_prompt, prior_fields, transcript)?;

        info!("Requesting clinical summary ({} transcript chars)", transcript.len());

        self.client
            .generate(api_key, model, vec![GenerativePart::Text(prompt)])
            .await
            .map_err(|e| ProntuError::Summary(e.to_string()))
    }
}

fn build_summary_prompt(
    system_prompt: &str,
    prior_fields: &ClinicalFields,
    transcript: &str,
) -> Result<String> {
    let prior_json = serde_json::to_string_pretty(prior_fields)?;

    Ok(format!(
        "{}\n\n{}\n\n[Campos clínicos já registrados]\n{}\n\n[Transcrição da sessão]\n{}",
        system_prompt.trim(),
        SUMMARY_RESPONSE_CONTRACT,
        prior_json,
        transcript
    ))
}
