use std::borrow::Cow;
use std::sync::Arc;
use crate::error::PipelineError;
use super::core_trait::SubwordTokenizer;
use super::vocabulary::{Vocabulary, UNKNOWN_TOKEN};

/// Marker written to the output in place of the engine's unknown token.
pub const DEFAULT_UNKNOWN_MARKER: &str = "UNK";

/// Turns input lines into token sequences and translated token sequences
/// back into output lines.
///
/// A `LineCodec` is unusable until [`LineCodec::load_vocabulary`] has been
/// called with the engine's source vocabulary. Decoding rewrites every raw
/// unknown token in the decoded text to a display marker.
pub struct LineCodec<T> {
    tokenizer: T,
    vocabulary: Option<Arc<Vocabulary>>,
    unknown_token: String,
    unknown_marker: String,
}

impl<T> LineCodec<T>
where T: SubwordTokenizer
{
    pub fn new(tokenizer: T) -> Self {
        Self {
            tokenizer,
            vocabulary: None,
            unknown_token: UNKNOWN_TOKEN.to_string(),
            unknown_marker: DEFAULT_UNKNOWN_MARKER.to_string(),
        }
    }

    /// Overrides the raw unknown token and the marker it is displayed as.
    pub fn with_unknown_marker(mut self, unknown_token: impl Into<String>, marker: impl Into<String>) -> Self {
        self.unknown_token = unknown_token.into();
        self.unknown_marker = marker.into();
        self
    }

    /// Couples the codec to the engine's source vocabulary.
    pub fn load_vocabulary(&mut self, vocabulary: Arc<Vocabulary>) -> Result<(), PipelineError> {
        self.tokenizer.set_vocabulary(&vocabulary).map_err(|e| match e {
            PipelineError::Vocabulary(_) => e,
            other => PipelineError::Vocabulary(format!("failed to set the tokenizer vocabulary: {other}")),
        })?;
        tracing::debug!(size = vocabulary.len(), "codec vocabulary loaded");
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.vocabulary.is_some()
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_deref()
    }

    pub fn encode(&self, line: &str) -> Result<Vec<String>, PipelineError> {
        if self.vocabulary.is_none() {
            return Err(PipelineError::Vocabulary(
                "codec used before the engine vocabulary was loaded".to_string(),
            ));
        }
        self.tokenizer.encode(line)
    }

    pub fn decode(&self, tokens: &[String]) -> Result<String, PipelineError> {
        let text = self.tokenizer.decode(tokens)?;
        Ok(match normalize_unknown(&text, &self.unknown_token, &self.unknown_marker) {
            Cow::Borrowed(_) => text,
            Cow::Owned(replaced) => replaced,
        })
    }
}

/// Replaces every occurrence of `unknown` in `text` with `marker`.
///
/// Nothing else in the text changes. An empty `unknown` pattern is a no-op.
pub fn normalize_unknown<'a>(text: &'a str, unknown: &str, marker: &str) -> Cow<'a, str> {
    if unknown.is_empty() || !text.contains(unknown) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.replace(unknown, marker))
    }
}
