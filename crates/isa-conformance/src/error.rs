use std::io;

use isa_semantics::{EvalError, Instruction};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConformanceError>;

#[derive(Debug, Error)]
pub enum ConformanceError {
    #[error("{suite}[{index}] {instruction}: {message}")]
    SemanticMismatch {
        suite: String,
        index: usize,
        instruction: Instruction,
        message: String,
    },

    #[error("{suite}[{index}] rdtsc: counter stuck at {first:#x} after {spins} re-reads")]
    CounterStalled {
        suite: String,
        index: usize,
        first: u64,
        spins: u64,
    },

    #[error("{suite}[{index}] {instruction}: host reference disagrees: {message}")]
    ReferenceMismatch {
        suite: String,
        index: usize,
        instruction: Instruction,
        message: String,
    },

    #[error("reference backend unavailable: {0}")]
    ReferenceUnavailable(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("{0}")]
    Filter(String),

    #[error("unknown suite {0:?}")]
    UnknownSuite(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid vector file: {0}")]
    VectorFile(String),
}

impl ConformanceError {
    /// Failures that mean the instruction itself misbehaved, as opposed to setup problems.
    pub fn is_vector_failure(&self) -> bool {
        matches!(
            self,
            ConformanceError::SemanticMismatch { .. }
                | ConformanceError::CounterStalled { .. }
                | ConformanceError::ReferenceMismatch { .. }
        )
    }
}
