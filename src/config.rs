use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, ProntuError};

// Default values for optional pipeline configuration
fn default_worker_count() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub audio: AudioConfig,
    pub ai: AiConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    pub host: String,
    /// Bind port for the HTTP API
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Maximum encoded size of a single audio part sent to the remote API
    pub max_chunk_bytes: u64,
    /// Bitrate (kbit/s) used when re-encoding oversized audio into chunks
    pub chunk_bitrate_kbps: u32,
    /// Optional parent directory for transcoding scratch space.
    /// Defaults to the system temp directory when unset.
    pub scratch_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the generative API
    pub endpoint: String,
    /// Default model name. Overridable with the PRONTU_MODEL environment
    /// variable and per practitioner.
    pub model: String,
    /// Request timeout in seconds for remote calls
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of background workers processing audio jobs
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Bounded capacity of the job queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                path: ".prontu/prontu.db".to_string(),
            },
            audio: AudioConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                max_chunk_bytes: 19 * 1024 * 1024,
                chunk_bitrate_kbps: 64,
                scratch_dir: None,
            },
            ai: AiConfig {
                endpoint: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                request_timeout_secs: 300,
            },
            pipeline: PipelineConfig {
                worker_count: default_worker_count(),
                queue_capacity: default_queue_capacity(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProntuError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| ProntuError::Config(format!("Failed to parse config file: {}", e)))?;

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProntuError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ProntuError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Environment overrides applied after any file load. Currently only the
    /// model name can be overridden (PRONTU_MODEL).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("PRONTU_MODEL") {
            if !model.trim().is_empty() {
                self.ai.model = model;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = Config::default();
        let toml_text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_text).unwrap();

        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.ai.model, "gemini-2.5-flash");
        assert_eq!(parsed.audio.max_chunk_bytes, 19 * 1024 * 1024);
        assert_eq!(parsed.pipeline.worker_count, 2);
    }

    #[test]
    fn test_pipeline_defaults_when_section_partial() {
        let toml_text = r#"
[server]
host = "0.0.0.0"
port = 9000

[database]
path = "test.db"

[audio]
ffmpeg_path = "ffmpeg"
ffprobe_path = "ffprobe"
max_chunk_bytes = 1000
chunk_bitrate_kbps = 64

[ai]
endpoint = "http://localhost"
model = "gemini-2.0-flash"
request_timeout_secs = 30

[pipeline]
"#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.pipeline.worker_count, 2);
        assert_eq!(config.pipeline.queue_capacity, 16);
    }
}
