//! # Stream Pipeline
//!
//! The read → encode → accumulate → dispatch → decode → write loop.
//!
//! [`StreamPipeline`] moves through four states:
//!
//! ```text
//! Reading <-> Accumulating  (one line at a time)
//!    |
//!    v  end of input or cancellation
//! Draining                  (submitted batches still in flight)
//!    |
//!    v
//! Done
//! ```
//!
//! Input and output go through the [`LineSource`] and [`LineSink`] traits;
//! [`TextLineSource`] and [`TextLineSink`] adapt any tokio reader or writer.
//! Output is always written in input order, and a failed or cancelled run
//! leaves the sink holding complete lines only. Reading pauses while the
//! lines held back behind a slow one weigh as much as the in-flight ceiling.

mod cancel;
mod config;
mod reorder;
mod sink;
mod source;
mod stream;

pub use cancel::CancelHandle;
pub use config::{CancelPolicy, InferenceErrorPolicy, PipelineConfig};
pub use reorder::ReorderBuffer;
pub use sink::{LineSink, TextLineSink};
pub use source::{LineSource, TextLineSource};
pub use stream::{PipelineState, RunSummary, StreamPipeline};
