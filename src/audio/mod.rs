// Audio preparation for the processing pipeline
//
// This module turns an uploaded audio payload into parts that fit the
// remote API's per-request size ceiling:
// - Commands: builders for ffmpeg/ffprobe invocations
// - Chunker: passthrough or duration-based re-encoding into chunks

pub mod chunker;
pub mod commands;

use async_trait::async_trait;

pub use chunker::*;
pub use commands::*;

use crate::error::Result;

/// A single audio part, individually decodable and below the configured
/// size ceiling.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Position of this chunk within the original recording
    pub index: usize,
    /// MIME type of the encoded bytes
    pub mime_type: String,
    /// Encoded audio bytes
    pub data: Vec<u8>,
}

/// Trait for splitting an audio payload into API-sized chunks
#[async_trait]
pub trait AudioSplitter: Send + Sync {
    /// Split the payload into ordered chunks. Payloads already under the
    /// ceiling are returned unchanged as a single chunk.
    async fn split(&self, audio: &[u8], mime_type: &str) -> Result<Vec<AudioChunk>>;

    /// Check if the underlying transcoder is available
    fn check_availability(&self) -> Result<()>;
}
