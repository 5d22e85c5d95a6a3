use ledgerlens_ingest::ParseError;
use thiserror::Error;

/// Failure reported by the text-analysis service.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Could not reach the service (connect, timeout, broken body).
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("rate limited: {message}")]
    RateLimited {
        /// Suggested delay, when the service sent one.
        retry_after_secs: Option<u64>,
        message: String,
    },

    #[error("auth error: {message}")]
    Auth { message: String },

    /// Non-success status that is neither auth nor rate limiting.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("service returned no usable text")]
    EmptyResponse,

    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// The request could not be built locally.
    #[error("invalid request: {message}")]
    Request { message: String },
}

impl CollaboratorError {
    /// Whether re-running the whole pipeline later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Transport { .. } | CollaboratorError::RateLimited { .. } => true,
            CollaboratorError::Api { retryable, .. } => *retryable,
            CollaboratorError::Auth { .. }
            | CollaboratorError::EmptyResponse
            | CollaboratorError::MalformedResponse { .. }
            | CollaboratorError::Request { .. } => false,
        }
    }
}

/// Fatal pipeline outcome. There is no partial result on any of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not read statement: {0}")]
    Parse(#[from] ParseError),

    /// `index` is 1-based.
    #[error("analysis of chunk {index}/{total} failed: {source}")]
    Summarize {
        index: usize,
        total: usize,
        source: CollaboratorError,
    },

    #[error("final analysis failed: {0}")]
    Aggregate(#[source] CollaboratorError),
}

impl PipelineError {
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Parse(_) => false,
            PipelineError::Summarize { source, .. } => source.is_transient(),
            PipelineError::Aggregate(source) => source.is_transient(),
        }
    }

    pub fn collaborator_error(&self) -> Option<&CollaboratorError> {
        match self {
            PipelineError::Parse(_) => None,
            PipelineError::Summarize { source, .. } | PipelineError::Aggregate(source) => Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
