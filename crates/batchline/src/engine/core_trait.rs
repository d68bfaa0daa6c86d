use std::path::Path;
use async_trait::async_trait;
use crate::codec::Vocabulary;
use crate::error::{InferenceError, PipelineError};
use crate::policy::{ComputeType, DeviceClass};
use super::model::LoadedModel;
use super::options::TranslationOptions;

/// Output for one source sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslationResult {
    /// Target token sequences, best first.
    pub hypotheses: Vec<Vec<String>>,
    /// One score per hypothesis, when scores were requested.
    pub scores: Option<Vec<f32>>,
}

impl TranslationResult {
    pub fn new(hypotheses: Vec<Vec<String>>) -> Self {
        Self {
            hypotheses,
            scores: None,
        }
    }

    pub fn with_scores(mut self, scores: Vec<f32>) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Best hypothesis, or an empty sequence when the engine produced none.
    pub fn output(&self) -> &[String] {
        self.hypotheses.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn score(&self) -> Option<f32> {
        self.scores.as_ref().and_then(|s| s.first().copied())
    }
}

/// # Translator
///
/// One replica of the inference engine.
///
/// A translator is a sequential execution context: the pool never calls
/// `translate_batch` on the same instance concurrently, which is why it takes
/// `&mut self`. Different replicas run concurrently and share no mutable state.
///
/// ## Contract
///
/// The returned vector must hold exactly one [`TranslationResult`] per
/// source sequence, in the same order. A failure must be returned as an
/// [`InferenceError`] and affects only this batch.
#[async_trait]
pub trait Translator: Send {
    async fn translate_batch(
        &mut self,
        source: &[Vec<String>],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, InferenceError>;
}

/// A loaded model that translates source sequences into target sequences.
pub trait SequenceToSequenceModel: Send + Sync {
    fn source_vocabulary(&self) -> &Vocabulary;

    fn target_vocabulary(&self) -> &Vocabulary;

    /// Builds an independent replica that runs on `threads` threads.
    fn create_replica(&self, threads: usize) -> Result<Box<dyn Translator>, PipelineError>;
}

/// Loads models from disk.
pub trait ModelLoader: Send + Sync {
    fn load(
        &self,
        path: &Path,
        device: DeviceClass,
        compute_type: ComputeType,
    ) -> Result<LoadedModel, PipelineError>;

    /// Number of CUDA devices visible to the engine, used to resolve `auto`.
    fn cuda_device_count(&self) -> usize {
        0
    }
}
