use std::sync::Arc;
use tracing::{info, debug};

use crate::audio::AudioChunk;
use crate::error::{Result, ProntuError};
use super::{GenerativeClient, GenerativePart};
use super::prompts::TRANSCRIPTION_PROMPT;

/// Sends audio chunks to the remote service for transcription. Stateless
/// beyond the shared HTTP client; the credential comes in per call.
pub struct Transcriber {
    client: Arc<dyn GenerativeClient>,
}

impl Transcriber {
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self { client }
    }

    /// Transcribe the ordered chunks of one recording, one request per
    /// chunk, and join the transcripts in order. Remote failures are not
    /// retried; the first failure aborts the job.
    pub async fn transcribe(
        &self,
        api_key: &str,
        model: &str,
        chunks: &[AudioChunk],
    ) -> Result<String> {
        if chunks.is_empty() {
            return Err(ProntuError::Transcription(
                "No audio chunks to transcribe".to_string(),
            ));
        }

        info!("Transcribing {} audio chunk(s)", chunks.len());

        let mut transcripts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            debug!("Transcribing chunk {} ({} bytes)", chunk.index, chunk.data.len());

            let parts = vec![
                GenerativePart::Text(TRANSCRIPTION_PROMPT.to_string()),
                GenerativePart::Audio {
                    mime_type: chunk.mime_type.clone(),
                    data: chunk.data.clone(),
                },
            ];

            let text = self.client
                .generate(api_key, model, parts)
                .await
                .map_err(|e| {
                    ProntuError::Transcription(format!("Chunk {}: {}", chunk.index, e))
                })?;

            transcripts.push(text.trim().to_string());
        }

        Ok(transcripts.join("\n\n"))
    }
}
