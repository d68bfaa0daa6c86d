//! Identity engine.
//!
//! `EchoModel` "translates" every source sequence into itself. It has no
//! weights, only vocabularies, which makes it useful for exercising a full run
//! (file I/O, tokenization, batching, ordering) without a neural engine.

use std::io;
use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use crate::codec::{Vocabulary, UNKNOWN_TOKEN};
use crate::error::{InferenceError, PipelineError};
use crate::policy::{ComputeType, DeviceClass};
use super::core_trait::{ModelLoader, SequenceToSequenceModel, TranslationResult, Translator};
use super::model::LoadedModel;
use super::options::TranslationOptions;

pub const SHARED_VOCABULARY_FILE: &str = "shared_vocabulary.txt";
pub const SOURCE_VOCABULARY_FILE: &str = "source_vocabulary.txt";
pub const TARGET_VOCABULARY_FILE: &str = "target_vocabulary.txt";
pub const LANGUAGE_MODEL_VOCABULARY_FILE: &str = "vocabulary.txt";

pub struct EchoModel {
    source: Vocabulary,
    target: Arc<Vocabulary>,
}

impl EchoModel {
    pub fn new(source: Vocabulary, target: Vocabulary) -> Self {
        Self {
            source,
            target: Arc::new(target),
        }
    }
}

impl SequenceToSequenceModel for EchoModel {
    fn source_vocabulary(&self) -> &Vocabulary {
        &self.source
    }

    fn target_vocabulary(&self) -> &Vocabulary {
        &self.target
    }

    fn create_replica(&self, threads: usize) -> Result<Box<dyn Translator>, PipelineError> {
        tracing::debug!(threads, "creating echo replica");
        Ok(Box::new(EchoTranslator {
            target: self.target.clone(),
        }))
    }
}

struct EchoTranslator {
    target: Arc<Vocabulary>,
}

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate_batch(
        &mut self,
        source: &[Vec<String>],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, InferenceError> {
        Ok(source
            .iter()
            .map(|sequence| {
                let hypothesis: Vec<String> = sequence
                    .iter()
                    .take(options.max_decoding_length)
                    .map(|token| {
                        if self.target.contains(token) {
                            token.clone()
                        } else {
                            UNKNOWN_TOKEN.to_string()
                        }
                    })
                    .collect();
                let hypotheses = vec![hypothesis; options.num_hypotheses.max(1)];
                let result = TranslationResult::new(hypotheses);
                if options.return_scores {
                    let scores = vec![0.0; result.hypotheses.len()];
                    result.with_scores(scores)
                } else {
                    result
                }
            })
            .collect())
    }
}

/// Loads an [`EchoModel`] from a model directory laid out like a converted
/// translation model: either `shared_vocabulary.txt`, or
/// `source_vocabulary.txt` plus an optional `target_vocabulary.txt`. A
/// directory holding only `vocabulary.txt` is reported as a language model.
#[derive(Debug, Clone, Default)]
pub struct EchoModelLoader;

impl ModelLoader for EchoModelLoader {
    fn load(&self, path: &Path, device: DeviceClass, compute_type: ComputeType) -> Result<LoadedModel, PipelineError> {
        tracing::info!(path = %path.display(), %device, %compute_type, "loading echo model");

        let shared = path.join(SHARED_VOCABULARY_FILE);
        if shared.is_file() {
            let vocabulary = Vocabulary::from_file(&shared)?;
            return Ok(LoadedModel::SequenceToSequence(Arc::new(EchoModel::new(
                vocabulary.clone(),
                vocabulary,
            ))));
        }

        let source = path.join(SOURCE_VOCABULARY_FILE);
        if source.is_file() {
            let source = Vocabulary::from_file(&source)?;
            let target_path = path.join(TARGET_VOCABULARY_FILE);
            let target = if target_path.is_file() {
                Vocabulary::from_file(&target_path)?
            } else {
                source.clone()
            };
            return Ok(LoadedModel::SequenceToSequence(Arc::new(EchoModel::new(source, target))));
        }

        if path.join(LANGUAGE_MODEL_VOCABULARY_FILE).is_file() {
            return Ok(LoadedModel::LanguageModel {
                name: path.display().to_string(),
            });
        }

        Err(PipelineError::Io {
            context: format!("loading model from {}", path.display()),
            source: io::Error::new(io::ErrorKind::NotFound, "no vocabulary file in model directory"),
        })
    }
}
