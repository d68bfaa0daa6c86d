use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batchline::engine::echo::EchoModelLoader;
use batchline::policy::DeviceClass;
use batchline::runner::load_tokenizer;
use batchline::RunConfig;

/// Batchline - translate a text file line by line on a pool of replicas
#[derive(Parser)]
#[command(name = "batchline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// File to translate, one sentence per line
    input: PathBuf,

    /// Where the translations are written, one per input line
    output: PathBuf,

    /// CPU cores available to the run
    #[arg(allow_hyphen_values = true)]
    cores: i64,

    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model directory
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Tokenizer model (default: <model-dir>/sp.vocab)
    #[arg(long)]
    tokenizer: Option<PathBuf>,

    /// auto, cpu, cuda or cuda:N
    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    beam_size: Option<usize>,

    #[arg(long)]
    max_decoding_length: Option<usize>,

    /// Tokens read ahead before a batch is dispatched
    #[arg(long)]
    accumulation_threshold: Option<usize>,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json(path)?,
            None => RunConfig::default(),
        };
        if let Some(model_dir) = &self.model_dir {
            config.model_dir = model_dir.clone();
        }
        if let Some(tokenizer) = &self.tokenizer {
            config.tokenizer = Some(tokenizer.clone());
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(beam_size) = self.beam_size {
            config.options.beam_size = beam_size;
        }
        if let Some(max_decoding_length) = self.max_decoding_length {
            config.options.max_decoding_length = max_decoding_length;
        }
        if self.accumulation_threshold.is_some() {
            config.accumulation_threshold = self.accumulation_threshold;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout stays free
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batchline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.run_config()?;
    // reject typos up front; `auto` is resolved once the model loader reports its devices
    if config.device != "auto" {
        config
            .device
            .parse::<DeviceClass>()
            .with_context(|| format!("invalid --device '{}'", config.device))?;
    }

    let tokenizer = load_tokenizer(&config.tokenizer_path())?;
    let summary = batchline::run_with(
        &config,
        &EchoModelLoader,
        tokenizer,
        &cli.input,
        &cli.output,
        cli.cores,
    )
    .await
    .with_context(|| format!("translating {}", cli.input.display()))?;

    info!(
        lines = summary.lines_written,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "done"
    );
    Ok(())
}
