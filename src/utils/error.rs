use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentProofError {
    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Engine initialization error: {0}")]
    EngineInit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PaymentProofError>;
