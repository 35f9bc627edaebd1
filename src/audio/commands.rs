use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, ProntuError};

/// Abstract transcoder command representation
#[derive(Debug, Clone)]
pub struct AudioCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl AudioCommand {
    /// Create a new transcoder command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Seek to a position (seconds) before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds))
    }

    /// Limit the encoded duration (seconds)
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{:.3}", seconds))
    }

    /// Disable video streams
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio channel count
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Set audio bitrate in kbit/s
    pub fn audio_bitrate_kbps(self, kbps: u32) -> Self {
        self.arg("-b:a").arg(format!("{}k", kbps))
    }

    /// Force output container format
    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Execute the command, discarding stdout. The subprocess is blocking,
    /// so it runs on the blocking thread pool.
    pub async fn execute(&self) -> Result<()> {
        self.capture_stdout().await.map(|_| ())
    }

    /// Execute the command and return its stdout as a string
    pub async fn capture_stdout(&self) -> Result<String> {
        debug!("Executing transcoder command: {} {:?}", self.binary_path, self.args);

        let command = self.clone();
        let output = tokio::task::spawn_blocking(move || {
            Command::new(&command.binary_path)
                .args(&command.args)
                .output()
        })
        .await
        .map_err(|e| ProntuError::Audio(format!("Transcoder task failed: {}", e)))?
        .map_err(|e| ProntuError::Audio(format!("Failed to execute transcoder: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProntuError::Audio(format!(
                "{} failed: {}",
                self.description,
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builder for the transcoder operations the chunker needs
pub struct AudioCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl AudioCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build a duration probe command (prints seconds to stdout)
    pub fn probe_duration<P: AsRef<Path>>(&self, input_path: P) -> AudioCommand {
        AudioCommand::new(&self.ffprobe_path, "Duration probe")
            .arg("-v").arg("error")
            .arg("-show_entries").arg("format=duration")
            .arg("-of").arg("default=noprint_wrappers=1:nokey=1")
            .output(input_path)
    }

    /// Build a segment re-encode command: one contiguous slice of the input,
    /// re-encoded to mono MP3 at a fixed bitrate for predictable size
    pub fn encode_segment<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        start_secs: f64,
        duration_secs: f64,
        bitrate_kbps: u32,
    ) -> AudioCommand {
        AudioCommand::new(&self.ffmpeg_path, "Segment re-encode")
            .seek(start_secs)
            .input(input_path)
            .duration(duration_secs)
            .no_video()
            .audio_channels(1)
            .audio_bitrate_kbps(bitrate_kbps)
            .format("mp3")
            .overwrite()
            .output(output_path)
    }

    /// Build a version check command
    pub fn version_check(&self) -> AudioCommand {
        AudioCommand::new(&self.ffmpeg_path, "Version check")
            .arg("-version")
    }
}
