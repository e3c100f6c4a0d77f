use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssayError {
    #[error("unreadable {format} file: {message}")]
    UnreadableFile { format: String, message: String },

    #[error("reference sample 'STD 1' not found in upload")]
    ReferenceSampleMissing,

    #[error(
        "batch rejected: {formulation_id} calculated value {value} is at or below threshold {threshold}"
    )]
    BatchRejected {
        formulation_id: String,
        value: f64,
        threshold: f64,
    },

    #[error("persistence failed: {message}")]
    Persistence { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssayError {
    pub fn unreadable(format: &str, message: impl Into<String>) -> Self {
        AssayError::UnreadableFile {
            format: format.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for AssayError {
    fn from(e: rusqlite::Error) -> Self {
        AssayError::Persistence {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssayError>;
