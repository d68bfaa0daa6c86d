use serde::{Deserialize, Serialize};
use crate::error::PipelineError;

/// Unit that batch budgets are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchType {
    /// Number of sequences.
    Examples,
    /// Number of source tokens.
    #[default]
    Tokens,
}

/// Per-call inference options, passed through to every replica untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationOptions {
    /// Search width. `1` is greedy decoding.
    pub beam_size: usize,
    /// Maximum number of target tokens per sequence.
    pub max_decoding_length: usize,
    /// Budget of one inference call. `0` means "use the execution profile's".
    pub max_batch_size: usize,
    pub batch_type: BatchType,
    /// Restrict the target vocabulary per batch, when the engine has a map for it.
    pub use_vmap: bool,
    pub return_scores: bool,
    pub num_hypotheses: usize,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            beam_size: 1,
            max_decoding_length: 150,
            max_batch_size: 0,
            batch_type: BatchType::Tokens,
            use_vmap: true,
            return_scores: false,
            num_hypotheses: 1,
        }
    }
}

impl TranslationOptions {
    /// Range checks only; the values are otherwise the engine's business.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.beam_size == 0 {
            return Err(PipelineError::Config("beam size must be at least 1".to_string()));
        }
        if self.max_decoding_length == 0 {
            return Err(PipelineError::Config(
                "max decoding length must be greater than 0".to_string(),
            ));
        }
        if self.num_hypotheses == 0 || self.num_hypotheses > self.beam_size {
            return Err(PipelineError::Config(format!(
                "num_hypotheses must be between 1 and the beam size ({}), got {}",
                self.beam_size, self.num_hypotheses
            )));
        }
        Ok(())
    }
}
