use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Queue fetch failed: {0}")]
    Queue(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Message body is not a well-formed document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transform failed for field '{field}': {message}")]
    Transform { field: &'static str, message: String },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
