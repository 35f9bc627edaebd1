use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;
use tracing::{info, debug};

use crate::config::AudioConfig;
use crate::error::{Result, ProntuError};
use super::{AudioChunk, AudioCommandBuilder, AudioSplitter};

/// MIME type of re-encoded chunks
pub const CHUNK_MIME_TYPE: &str = "audio/mpeg";

/// Headroom factor on the size ceiling, absorbing container overhead on top
/// of the nominal bitrate
const SIZE_HEADROOM: f64 = 0.9;

/// A planned contiguous slice of the recording
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Compute the segmentation plan for a recording of `total_secs` so that each
/// segment re-encoded at `bitrate_kbps` stays under `max_chunk_bytes`.
/// Segments are contiguous and cover the full duration.
pub fn plan_segments(total_secs: f64, max_chunk_bytes: u64, bitrate_kbps: u32) -> Vec<Segment> {
    let bytes_per_sec = (bitrate_kbps as f64) * 1000.0 / 8.0;
    let max_segment_secs = (max_chunk_bytes as f64 * SIZE_HEADROOM) / bytes_per_sec;

    if total_secs <= max_segment_secs {
        return vec![Segment {
            start_secs: 0.0,
            duration_secs: total_secs,
        }];
    }

    let count = (total_secs / max_segment_secs).ceil() as usize;
    let segment_secs = total_secs / count as f64;

    let mut segments = Vec::with_capacity(count);
    for i in 0..count {
        let start = i as f64 * segment_secs;
        // The last segment absorbs floating point remainder so the plan
        // always covers the full duration.
        let duration = if i == count - 1 {
            total_secs - start
        } else {
            segment_secs
        };
        segments.push(Segment {
            start_secs: start,
            duration_secs: duration,
        });
    }

    segments
}

/// FFmpeg-based splitter: passthrough under the ceiling, duration-based
/// re-encoding above it
pub struct FfmpegChunker {
    config: AudioConfig,
    command_builder: AudioCommandBuilder,
}

impl FfmpegChunker {
    /// Create a new chunker
    pub fn new(config: AudioConfig) -> Self {
        let command_builder = AudioCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
        }
    }

    /// Create the per-job scratch directory. Dropping the handle removes the
    /// directory and everything in it, on success and failure alike.
    fn create_scratch(&self) -> Result<TempDir> {
        let scratch = match &self.config.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                TempDir::new_in(parent)
            }
            None => TempDir::new(),
        };

        scratch.map_err(|e| ProntuError::Audio(format!("Failed to create scratch directory: {}", e)))
    }

    async fn probe_duration(&self, input_path: &PathBuf) -> Result<f64> {
        let stdout = self.command_builder.probe_duration(input_path).capture_stdout().await?;

        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| ProntuError::Audio(format!("Unparseable duration '{}': {}", stdout.trim(), e)))
    }
}

#[async_trait]
impl AudioSplitter for FfmpegChunker {
    async fn split(&self, audio: &[u8], mime_type: &str) -> Result<Vec<AudioChunk>> {
        if audio.is_empty() {
            return Err(ProntuError::InvalidInput("Empty audio payload".to_string()));
        }

        // Already under the ceiling: hand it back untouched, no transcoder
        // involved and no scratch files written.
        if audio.len() as u64 <= self.config.max_chunk_bytes {
            debug!("Audio payload under size ceiling, passing through as one chunk");
            return Ok(vec![AudioChunk {
                index: 0,
                mime_type: mime_type.to_string(),
                data: audio.to_vec(),
            }]);
        }

        info!(
            "Audio payload of {} bytes exceeds ceiling of {} bytes, splitting",
            audio.len(),
            self.config.max_chunk_bytes
        );

        let scratch = self.create_scratch()?;
        let input_path = scratch.path().join(format!("input.{}", extension_for_mime(mime_type)));
        std::fs::write(&input_path, audio)?;

        let duration_secs = self.probe_duration(&input_path).await?;
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(ProntuError::InvalidInput(format!(
                "Audio has no playable duration ({} s)",
                duration_secs
            )));
        }

        let segments = plan_segments(
            duration_secs,
            self.config.max_chunk_bytes,
            self.config.chunk_bitrate_kbps,
        );

        info!("Splitting {:.1}s recording into {} chunks", duration_secs, segments.len());

        let mut chunks = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let output_path = scratch.path().join(format!("chunk_{:03}.mp3", index));

            self.command_builder
                .encode_segment(
                    &input_path,
                    &output_path,
                    segment.start_secs,
                    segment.duration_secs,
                    self.config.chunk_bitrate_kbps,
                )
                .execute()
                .await?;

            let data = std::fs::read(&output_path)?;
            if data.len() as u64 > self.config.max_chunk_bytes {
                return Err(ProntuError::Audio(format!(
                    "Re-encoded chunk {} is {} bytes, above the {} byte ceiling",
                    index,
                    data.len(),
                    self.config.max_chunk_bytes
                )));
            }

            debug!(
                "Chunk {}: {:.1}s from {:.1}s, {} bytes",
                index, segment.duration_secs, segment.start_secs, data.len()
            );

            chunks.push(AudioChunk {
                index,
                mime_type: CHUNK_MIME_TYPE.to_string(),
                data,
            });
        }

        Ok(chunks)
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .map_err(|e| ProntuError::Audio(format!("Transcoder not found: {}", e)))?;

        if output.status.success() {
            info!("Transcoder is available");
            Ok(())
        } else {
            Err(ProntuError::Audio("Transcoder version check failed".to_string()))
        }
    }
}

/// Pick a file extension the transcoder can use for container detection
fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" | "application/ogg" => "ogg",
        "audio/webm" | "video/webm" => "webm",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => "m4a",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => "bin",
    }
}
