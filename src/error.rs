use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProntuError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Audio processing error: {0}")]
    Audio(String),

    #[error("Remote API error: {0}")]
    RemoteApi(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Summarization error: {0}")]
    Summary(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record {0} is already being processed")]
    RecordBusy(i64),

    #[error("Processing queue is full")]
    QueueFull,

    #[error("Processing interrupted by shutdown")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, ProntuError>;
