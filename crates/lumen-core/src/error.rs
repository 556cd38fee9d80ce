use thiserror::Error;

pub type Result<T> = std::result::Result<T, LumenError>;

#[derive(Error, Debug)]
pub enum LumenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Telemetry system error: {message}")]
    System { message: String },
}

/// Failure while turning a single structured-state entry into properties.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Content length mismatch: declared {declared} bytes, read {read}")]
    ContentLength { declared: u64, read: u64 },

    #[error("Body is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Body read failed: {0}")]
    Body(#[from] std::io::Error),

    #[error("Object serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure raised by a message formatter.
#[derive(Error, Debug)]
#[error("Message formatting failed: {message}")]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by a telemetry sink.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink unavailable: {message}")]
    Unavailable { message: String },

    #[error("Sink rejected record: {message}")]
    Rejected { message: String },
}
