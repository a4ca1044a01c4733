use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid scan input: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote scorer error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Remote and transport failures are recoverable by a local scorer;
    /// bad input is not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ScanError::Validation(_))
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        ScanError::Remote(e.to_string())
    }
}
