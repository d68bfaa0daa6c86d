//! # Errors
//!
//! Every fallible operation in the crate returns [`PipelineError`]. The four
//! variants map to the four ways a run can fail: a stream could not be read or
//! written, the tokenizer and engine vocabularies disagree, a batch failed
//! inside a replica, or the run was configured with values that make no sense.
//!
//! All of them are fatal for the run that produced them. Nothing in this crate
//! retries automatically.

use std::io;
use thiserror::Error;

/// Failure reported by a replica for a single inference batch.
///
/// This is the error type engines return from
/// [`Translator::translate_batch`](crate::engine::Translator::translate_batch).
/// The pipeline scopes it to the lines of the failed batch before surfacing
/// it as [`PipelineError::Inference`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct InferenceError {
    message: String,
}

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error taxonomy for a translation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stream could not be opened, read, or written.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Codec/engine vocabulary mismatch, or a vocabulary/tokenizer failed to load.
    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    /// A batch failed inside a replica. The range covers the batch's input lines.
    #[error("inference failed for lines {first_line}..={last_line}: {message}")]
    Inference {
        first_line: usize,
        last_line: usize,
        message: String,
    },

    /// Invalid core count, device string, or translation option.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Builds a `map_err` adapter that tags an [`io::Error`] with what was being done.
    ///
    /// ```
    /// # use batchline::PipelineError;
    /// let err = std::fs::read("/definitely/not/here").map_err(PipelineError::io("reading vocabulary"));
    /// assert!(matches!(err, Err(PipelineError::Io { .. })));
    /// ```
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| PipelineError::Io { context, source }
    }

    /// Scopes an engine failure to the input lines it covered.
    pub fn inference(lines: &[usize], error: &InferenceError) -> Self {
        let first_line = lines.iter().copied().min().unwrap_or_default();
        let last_line = lines.iter().copied().max().unwrap_or_default();
        PipelineError::Inference {
            first_line,
            last_line,
            message: error.message().to_string(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
