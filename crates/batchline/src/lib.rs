//! # Batchline
//!
//! Streaming batch translation: read lines, tokenize them, batch them,
//! translate the batches on a pool of inference replicas, and write the
//! detokenized results back **in input order**.
//!
//! ## Overview
//!
//! The crate is the orchestration layer between a line-oriented text file and
//! a multi-replica sequence-to-sequence inference engine. It overlaps I/O,
//! tokenization and variable-latency inference while keeping memory bounded
//! through admission control on the amount of work in flight.
//!
//! ```text
//! input -> LineCodec::encode -> batch accumulator -> ReplicaPool -> LineCodec::decode -> output
//!                                                       ^
//!                                     DevicePolicy sizes replicas and batches
//! ```
//!
//! ## Architecture
//!
//! ### Device policy
//!
//! [`policy::DevicePolicy`] turns a device class and a core count into an
//! [`policy::ExecutionProfile`]: replica count, threads per replica, compute
//! type, per-call batch budget and in-flight ceiling.
//!
//! ### Codec
//!
//! [`codec::LineCodec`] wraps a [`codec::SubwordTokenizer`] and couples it to
//! the engine's source vocabulary. It renders the engine's unknown token as a
//! readable marker on the way out.
//!
//! ### Engine
//!
//! The inference engine is an external collaborator, reached through the
//! traits in [`engine`]. A weightless [`engine::echo`] engine ships with the
//! crate.
//!
//! ### Replica pool
//!
//! [`pool::ReplicaPool`] runs one tokio task per replica over a shared job
//! queue. Completions arrive on a [`communication::CompletionStream`] in
//! whatever order replicas finish.
//!
//! ### Pipeline
//!
//! [`pipeline::StreamPipeline`] drives the whole loop and restores input order
//! before writing.
//!
//! ## Features
//!
//! - **tokenizers** - Enables the Hugging Face tokenizer adapter
//!
//! ## Example
//!
//! ```no_run
//! # async fn translate() -> Result<(), batchline::PipelineError> {
//! let summary = batchline::run("input.txt", "output.txt", 8).await?;
//! println!("{} lines translated", summary.lines_written);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod communication;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod pool;
pub mod runner;

pub use error::{InferenceError, PipelineError};
pub use pipeline::RunSummary;
pub use runner::{run, run_with, RunConfig};
