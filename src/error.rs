use thiserror::Error;

// Unified error type for krylov-amg

#[derive(Error, Debug)]
pub enum KError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("malformed sparse operator: {0}")]
    Structural(String),
    #[error("relaxation setup failed at level {level}: {reason}")]
    RelaxationSetup { level: usize, reason: String },
    #[error("sparse kernel failed: {0}")]
    Sparse(#[from] faer::sparse::FaerError),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("cannot read parameter file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed parameter file: {0}")]
    ParamFile(#[from] serde_json::Error),
}

impl KError {
    /// Shorthand for an unsupported runtime option.
    pub(crate) fn unsupported(what: &str, value: &str) -> Self {
        KError::Configuration(format!("unsupported {what} '{value}'"))
    }
}
