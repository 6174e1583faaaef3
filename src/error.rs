// Error taxonomy for the analysis pipeline and retrieval operations.
//
// Only `Invocation` is fatal to a job; everything else is either a typed
// response the caller acts on (`NotReady`, `NotFound`) or a degraded result
// that never changes job status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An external stage program exited non-zero. Fatal to the owning job.
    #[error("{program} failed: {detail}")]
    Invocation { program: String, detail: String },

    /// The requested artifact has not been produced yet. Callers poll.
    #[error("not ready: {0}")]
    NotReady(String),

    /// No matching resource anywhere in the resolution chain.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request from the caller (unknown job, wrong status, bad name).
    #[error("{0}")]
    InvalidInput(String),

    /// Persistence-layer failure surfaced from the JSON store.
    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn invocation(program: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Invocation {
            program: program.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
