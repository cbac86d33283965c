#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Malformed parameters: {0}")]
    MalformedParameters(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
