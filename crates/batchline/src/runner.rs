//! File-to-file runs.
//!
//! [`run`] is the whole program in one call: pick an execution profile,
//! load the model and tokenizer, couple their vocabularies, start the
//! replicas and stream the input file into the output file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::info;
use uuid::Uuid;
use crate::codec::{GreedySubwordTokenizer, LineCodec, SubwordTokenizer};
use crate::engine::echo::EchoModelLoader;
use crate::engine::{ModelLoader, TranslationOptions};
use crate::error::PipelineError;
use crate::pipeline::{PipelineConfig, RunSummary, StreamPipeline, TextLineSink, TextLineSource};
use crate::policy::{DeviceClass, DevicePolicy, PolicyDefaults};
use crate::pool::ReplicaPool;

pub const DEFAULT_MODEL_DIR: &str = "/model";

/// Tokenizer piece list looked up inside the model directory.
pub const DEFAULT_TOKENIZER_FILE: &str = "sp.vocab";

/// Everything a run needs besides the input, output and core count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model_dir: PathBuf,
    /// Tokenizer model; `<model_dir>/sp.vocab` when unset.
    pub tokenizer: Option<PathBuf>,
    /// `auto`, `cpu`, `cuda` or `cuda:N`.
    pub device: String,
    pub policy: PolicyDefaults,
    pub options: TranslationOptions,
    pub pipeline: PipelineConfig,
    /// Read-ahead before a batch is dispatched; the profile's when unset.
    pub accumulation_threshold: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            tokenizer: None,
            device: "auto".to_string(),
            policy: PolicyDefaults::default(),
            options: TranslationOptions::default(),
            pipeline: PipelineConfig::default(),
            accumulation_threshold: None,
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(PipelineError::io(format!("reading config {}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.tokenizer
            .clone()
            .unwrap_or_else(|| self.model_dir.join(DEFAULT_TOKENIZER_FILE))
    }
}

/// Loads the tokenizer at `path`.
///
/// With the `tokenizers` feature a `.json` file is read as a Hugging Face
/// tokenizer; anything else is a piece list for [`GreedySubwordTokenizer`].
pub fn load_tokenizer(path: &Path) -> Result<Box<dyn SubwordTokenizer>, PipelineError> {
    #[cfg(feature = "tokenizers")]
    {
        if path.extension().is_some_and(|ext| ext == "json") {
            return Ok(Box::new(crate::codec::huggingface::HuggingFaceTokenizer::from_file(path)?));
        }
    }
    Ok(Box::new(GreedySubwordTokenizer::from_file(path)?))
}

/// Translates `input_path` into `output_path` with the default configuration.
pub async fn run(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    core_count: i64,
) -> Result<RunSummary, PipelineError> {
    let config = RunConfig::default();
    let tokenizer = load_tokenizer(&config.tokenizer_path())?;
    run_with(&config, &EchoModelLoader, tokenizer, input_path.as_ref(), output_path.as_ref(), core_count).await
}

/// Translates `input_path` into `output_path`.
///
/// Configuration errors are reported before anything is loaded, and
/// vocabulary errors before any file is opened.
pub async fn run_with<T>(
    config: &RunConfig,
    loader: &dyn ModelLoader,
    tokenizer: T,
    input_path: &Path,
    output_path: &Path,
    core_count: i64,
) -> Result<RunSummary, PipelineError>
where T: SubwordTokenizer
{
    let run_id = Uuid::new_v4();
    config.options.validate()?;
    if config.accumulation_threshold == Some(0) {
        return Err(PipelineError::Config(
            "accumulation threshold must be greater than 0".to_string(),
        ));
    }

    let device = DeviceClass::resolve(&config.device, loader.cuda_device_count())?;
    let profile = DevicePolicy::new(config.policy.clone()).select_for(device, core_count)?;
    info!(
        %run_id,
        device = %profile.device,
        compute_type = %profile.compute_type,
        replicas = profile.replicas,
        threads_per_replica = profile.threads_per_replica,
        max_batch_size = profile.max_batch_size,
        "execution profile selected"
    );

    let model = loader
        .load(&config.model_dir, profile.device, profile.compute_type)?
        .as_sequence_to_sequence()?;
    let mut codec = LineCodec::new(tokenizer);
    codec.load_vocabulary(Arc::new(model.source_vocabulary().clone()))?;

    let input = File::open(input_path)
        .await
        .map_err(PipelineError::io(format!("opening input {}", input_path.display())))?;
    let output = File::create(output_path)
        .await
        .map_err(PipelineError::io(format!("creating output {}", output_path.display())))?;

    let (pool, completions) = ReplicaPool::new(model.as_ref(), &profile)?;
    let pipeline = StreamPipeline::new(codec, pool, completions, config.pipeline.clone())?;

    let threshold = config.accumulation_threshold.unwrap_or(profile.read_ahead);
    let mut source = TextLineSource::new(BufReader::new(input));
    let mut sink = TextLineSink::new(output);
    let summary = pipeline
        .run(&mut source, &mut sink, threshold, config.options.clone())
        .await?;

    info!(
        %run_id,
        lines_read = summary.lines_read,
        lines_written = summary.lines_written,
        batches = summary.batches_submitted,
        peak_held_back = summary.peak_held_back,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run finished"
    );
    Ok(summary)
}
