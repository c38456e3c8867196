use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Upstream format error: {0}")]
    UpstreamFormatError(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Upstream variant count mismatch: expected {expected}, found {found}")]
    UpstreamCountMismatch { expected: usize, found: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
