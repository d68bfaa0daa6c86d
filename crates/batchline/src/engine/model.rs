use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use crate::error::PipelineError;
use super::core_trait::SequenceToSequenceModel;

/// A model handle as returned by a [`ModelLoader`](super::ModelLoader).
///
/// Only sequence-to-sequence models expose source and target vocabularies,
/// so only they can drive a translation run. Other model kinds are
/// represented so a loader can report what it found instead of failing
/// opaquely.
#[derive(Clone)]
pub enum LoadedModel {
    SequenceToSequence(Arc<dyn SequenceToSequenceModel>),
    /// A decoder-only language model; it has no source vocabulary.
    LanguageModel { name: String },
    /// An encoder without a decoder.
    Encoder { name: String },
}

impl LoadedModel {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadedModel::SequenceToSequence(_) => "sequence-to-sequence",
            LoadedModel::LanguageModel { .. } => "language model",
            LoadedModel::Encoder { .. } => "encoder",
        }
    }

    /// Whether the model can provide source/target vocabularies.
    pub fn has_vocabularies(&self) -> bool {
        matches!(self, LoadedModel::SequenceToSequence(_))
    }

    /// Returns the sequence-to-sequence capability or fails with a vocabulary error.
    pub fn as_sequence_to_sequence(&self) -> Result<Arc<dyn SequenceToSequenceModel>, PipelineError> {
        match self {
            LoadedModel::SequenceToSequence(model) => Ok(model.clone()),
            LoadedModel::LanguageModel { name } | LoadedModel::Encoder { name } => {
                Err(PipelineError::Vocabulary(format!(
                    "model '{name}' is a {}, which has no source vocabulary to share with the tokenizer",
                    self.kind()
                )))
            }
        }
    }
}

impl Debug for LoadedModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadedModel::SequenceToSequence(model) => f
                .debug_struct("SequenceToSequence")
                .field("source_vocabulary", &model.source_vocabulary().len())
                .field("target_vocabulary", &model.target_vocabulary().len())
                .finish(),
            LoadedModel::LanguageModel { name } => f.debug_struct("LanguageModel").field("name", name).finish(),
            LoadedModel::Encoder { name } => f.debug_struct("Encoder").field("name", name).finish(),
        }
    }
}
