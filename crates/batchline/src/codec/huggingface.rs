use std::collections::HashSet;
use std::path::Path;
use tokenizers::Tokenizer;
use crate::error::PipelineError;
use super::core_trait::SubwordTokenizer;
use super::vocabulary::{Vocabulary, UNKNOWN_TOKEN};

/// Adapter over a Hugging Face `tokenizer.json`.
///
/// Pieces the tokenizer produces that are missing from the engine vocabulary
/// are replaced with the unknown token, so the engine never sees a token it
/// cannot index.
pub struct HuggingFaceTokenizer {
    inner: Tokenizer,
    engine_tokens: Option<HashSet<String>>,
}

impl HuggingFaceTokenizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path).map_err(|e| {
            PipelineError::Vocabulary(format!("unable to load tokenizer {}: {e}", path.display()))
        })?;
        Ok(Self {
            inner,
            engine_tokens: None,
        })
    }
}

impl SubwordTokenizer for HuggingFaceTokenizer {
    fn set_vocabulary(&mut self, vocabulary: &Vocabulary) -> Result<(), PipelineError> {
        let own = self.inner.get_vocab(true);
        let shared = vocabulary.tokens().iter().filter(|t| own.contains_key(t.as_str())).count();
        if shared == 0 {
            return Err(PipelineError::Vocabulary(
                "tokenizer and engine vocabularies share no tokens".to_string(),
            ));
        }
        tracing::debug!(shared, engine = vocabulary.len(), tokenizer = own.len(), "vocabulary overlap");
        self.engine_tokens = Some(vocabulary.tokens().iter().cloned().collect());
        Ok(())
    }

    fn encode(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| PipelineError::Vocabulary(format!("tokenizer failed to encode: {e}")))?;
        let tokens = encoding.get_tokens().iter().map(|token| match &self.engine_tokens {
            Some(allowed) if !allowed.contains(token) => UNKNOWN_TOKEN.to_string(),
            _ => token.clone(),
        });
        Ok(tokens.collect())
    }

    fn decode(&self, pieces: &[String]) -> Result<String, PipelineError> {
        let unknown_id = self.inner.token_to_id(UNKNOWN_TOKEN);
        let ids: Vec<u32> = pieces
            .iter()
            .filter_map(|piece| self.inner.token_to_id(piece).or(unknown_id))
            .collect();
        self.inner
            .decode(&ids, false)
            .map_err(|e| PipelineError::Vocabulary(format!("tokenizer failed to decode: {e}")))
    }
}
