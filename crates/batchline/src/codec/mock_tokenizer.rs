use crate::codec::{SubwordTokenizer, Vocabulary};
use crate::error::PipelineError;

// Character-level stub: every char becomes one uppercased token, decode concatenates.
#[derive(Debug, Default, Clone)]
pub struct UppercaseCharTokenizer {
    reject_vocabulary: bool,
}

impl UppercaseCharTokenizer {
    pub fn rejecting() -> Self {
        Self { reject_vocabulary: true }
    }
}

impl SubwordTokenizer for UppercaseCharTokenizer {
    fn set_vocabulary(&mut self, _vocabulary: &Vocabulary) -> Result<(), PipelineError> {
        if self.reject_vocabulary {
            return Err(PipelineError::Vocabulary("stub rejects every vocabulary".to_string()));
        }
        Ok(())
    }

    fn encode(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        Ok(text.chars().map(|c| c.to_uppercase().collect()).collect())
    }

    fn decode(&self, pieces: &[String]) -> Result<String, PipelineError> {
        Ok(pieces.concat())
    }
}
