use crate::error::PipelineError;
use super::vocabulary::Vocabulary;

/// # SubwordTokenizer
///
/// The segmentation model that turns text into subword pieces and back.
///
/// Implementations must be deterministic: the same text always encodes to the
/// same pieces, and decoding does not depend on earlier calls.
///
/// ## Vocabulary coupling
///
/// Before any encoding happens the tokenizer is handed the inference engine's
/// source vocabulary through [`SubwordTokenizer::set_vocabulary`]. From then on
/// it must only emit pieces that appear in that vocabulary (or the unknown
/// token). An implementation that cannot honour the vocabulary returns
/// [`PipelineError::Vocabulary`].
pub trait SubwordTokenizer: Send + Sync {
    /// Restricts the tokenizer to the engine's vocabulary.
    fn set_vocabulary(&mut self, vocabulary: &Vocabulary) -> Result<(), PipelineError>;

    /// Splits one line of text into pieces.
    fn encode(&self, text: &str) -> Result<Vec<String>, PipelineError>;

    /// Joins pieces back into text.
    fn decode(&self, pieces: &[String]) -> Result<String, PipelineError>;
}

impl<T: SubwordTokenizer + ?Sized> SubwordTokenizer for Box<T> {
    fn set_vocabulary(&mut self, vocabulary: &Vocabulary) -> Result<(), PipelineError> {
        (**self).set_vocabulary(vocabulary)
    }

    fn encode(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        (**self).encode(text)
    }

    fn decode(&self, pieces: &[String]) -> Result<String, PipelineError> {
        (**self).decode(pieces)
    }
}
