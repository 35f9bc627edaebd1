// Remote generative API integration
//
// Two sequential calls per processing run:
// - Transcriber: audio chunks + fixed transcription instruction -> transcript
// - Summarizer: transcript + prior clinical fields + system prompt -> JSON
//
// The parser tolerates prose and code fences around the returned JSON.

pub mod gemini;
pub mod parse;
pub mod prompts;
pub mod summarize;
pub mod transcribe;

use async_trait::async_trait;

pub use gemini::*;
pub use parse::*;
pub use summarize::*;
pub use transcribe::*;

use crate::error::Result;

/// One part of a generative request
#[derive(Debug, Clone)]
pub enum GenerativePart {
    /// Plain instruction or context text
    Text(String),
    /// Binary audio payload with its MIME type
    Audio { mime_type: String, data: Vec<u8> },
}

/// Trait for the remote generative service. The credential is caller-supplied
/// per request; the client holds no state across calls.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send one request and return the model's raw text response
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        parts: Vec<GenerativePart>,
    ) -> Result<String>;
}
