use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use crate::codec::Vocabulary;
use crate::engine::{SequenceToSequenceModel, TranslationOptions, TranslationResult, Translator};
use crate::error::{InferenceError, PipelineError};

// Knobs shared by every replica of a ReversingModel.
#[derive(Debug, Default)]
pub struct Script {
    pub slow_token: Option<String>,
    pub slow_delay: Duration,
    pub fail_token: Option<String>,
    pub panic_token: Option<String>,
    pub active_sequences: AtomicUsize,
    pub peak_sequences: AtomicUsize,
    pub batches: AtomicUsize,
    // first source sequence of each batch, in completion order
    pub completed: Mutex<Vec<Vec<String>>>,
}

impl Script {
    pub fn completed(&self) -> Vec<Vec<String>> {
        self.completed.lock().unwrap().clone()
    }
}

// Stub engine: reverses the token order of every sequence.
pub struct ReversingModel {
    vocabulary: Vocabulary,
    pub script: Arc<Script>,
}

impl ReversingModel {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(tokens, Script::default())
    }

    pub fn with_script<I, S>(tokens: I, script: Script) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: Vocabulary::from_tokens(tokens).unwrap(),
            script: Arc::new(script),
        }
    }

    pub fn translator(&self) -> ReversingTranslator {
        ReversingTranslator {
            script: self.script.clone(),
        }
    }
}

impl SequenceToSequenceModel for ReversingModel {
    fn source_vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn target_vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn create_replica(&self, _threads: usize) -> Result<Box<dyn Translator>, PipelineError> {
        Ok(Box::new(self.translator()))
    }
}

pub struct ReversingTranslator {
    script: Arc<Script>,
}

fn contains(source: &[Vec<String>], token: &Option<String>) -> bool {
    token
        .as_ref()
        .is_some_and(|t| source.iter().any(|seq| seq.iter().any(|s| s == t)))
}

#[async_trait]
impl Translator for ReversingTranslator {
    async fn translate_batch(
        &mut self,
        source: &[Vec<String>],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, InferenceError> {
        let script = &self.script;
        let now_active = script.active_sequences.fetch_add(source.len(), Ordering::SeqCst) + source.len();
        script.peak_sequences.fetch_max(now_active, Ordering::SeqCst);
        script.batches.fetch_add(1, Ordering::SeqCst);

        if contains(source, &script.slow_token) {
            tokio::time::sleep(script.slow_delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        script.active_sequences.fetch_sub(source.len(), Ordering::SeqCst);

        if contains(source, &script.panic_token) {
            panic!("replica blew up");
        }
        if contains(source, &script.fail_token) {
            return Err(InferenceError::new("scripted failure"));
        }

        if let Some(first) = source.first() {
            script.completed.lock().unwrap().push(first.clone());
        }
        Ok(source
            .iter()
            .map(|seq| {
                let reversed: Vec<String> = seq.iter().rev().cloned().collect();
                let result = TranslationResult::new(vec![reversed]);
                if options.return_scores {
                    result.with_scores(vec![-(seq.len() as f32)])
                } else {
                    result
                }
            })
            .collect())
    }
}
