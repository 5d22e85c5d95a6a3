use thiserror::Error;

/// Fatal statement-level failures. Individual bad rows never surface here.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column `{0}` in header")]
    MissingColumn(&'static str),

    #[error("statement has no header row")]
    MissingHeader,
}

pub type Result<T> = std::result::Result<T, ParseError>;
