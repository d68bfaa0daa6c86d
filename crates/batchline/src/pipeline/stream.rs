use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::StreamExt;
use tracing::{debug, info, warn};
use crate::codec::{LineCodec, SubwordTokenizer};
use crate::communication::{Batch, Completion, CompletionStream};
use crate::engine::{BatchType, TranslationOptions};
use crate::error::{InferenceError, PipelineError};
use crate::pool::ReplicaPool;
use super::cancel::CancelHandle;
use super::config::{CancelPolicy, InferenceErrorPolicy, PipelineConfig};
use super::reorder::ReorderBuffer;
use super::sink::LineSink;
use super::source::LineSource;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Waiting on the next input line.
    Reading,
    /// Adding the line just read to the current batch.
    Accumulating,
    /// Input is exhausted or cancelled; waiting on submitted batches.
    Draining,
    Done,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: usize,
    pub lines_written: usize,
    /// Inference batches handed to the pool, after splitting.
    pub batches_submitted: usize,
    pub cancelled: bool,
    /// Highest in-flight budget observed by admission control.
    pub peak_in_flight: usize,
    /// Most finished lines held back at once behind an earlier line.
    pub peak_held_back: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Progress {
    reorder: ReorderBuffer,
    batch_type: BatchType,
    lines_read: usize,
    lines_written: usize,
    batches_submitted: usize,
    outstanding: usize,
    peak_held_back: usize,
    cancelled: bool,
    abandoned: bool,
}

// How a wait inside the loop ended.
enum Woken<T> {
    Ready(T),
    Completed(Option<Completion>),
    Cancelled,
}

/// Reads lines, translates them on a [`ReplicaPool`], and writes the
/// results in input order.
///
/// The pipeline itself runs on a single task. Reading, encoding, batch
/// assembly, decoding and writing are sequential; only inference runs in
/// parallel, on the pool's replicas. Results that finish ahead of an earlier
/// line wait in a [`ReorderBuffer`].
///
/// Memory stays bounded on both sides of the pool. Admission control caps
/// the work in flight, and reading pauses while the lines held back in the
/// reorder buffer weigh as much as the in-flight ceiling. Every wait also
/// watches the [`CancelHandle`].
///
/// A pipeline runs once; [`StreamPipeline::run`] consumes it.
pub struct StreamPipeline<T> {
    codec: LineCodec<T>,
    pool: ReplicaPool,
    completions: CompletionStream,
    config: PipelineConfig,
    cancel: CancelHandle,
}

impl<T> StreamPipeline<T>
where T: SubwordTokenizer
{
    /// Wires a codec to a pool.
    ///
    /// The codec must already hold the engine's source vocabulary; streaming
    /// never starts with an uncoupled codec.
    pub fn new(
        codec: LineCodec<T>,
        pool: ReplicaPool,
        completions: CompletionStream,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        if !codec.is_initialized() {
            return Err(PipelineError::Vocabulary(
                "the codec has no vocabulary; load the engine's source vocabulary first".to_string(),
            ));
        }
        let codec = codec.with_unknown_marker(config.unknown_token.clone(), config.unknown_marker.clone());
        Ok(Self {
            codec,
            pool,
            completions,
            config,
            cancel: CancelHandle::new(),
        })
    }

    /// A handle that cancels this pipeline's run from anywhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Streams every line of `source` through the pool into `sink`.
    ///
    /// A batch is dispatched once it reaches `accumulation_threshold`, in the
    /// unit of `options.batch_type`; the pool splits it further to the
    /// per-call budget. The sink is flushed before returning, whether the run
    /// succeeded or not, and only ever holds a gap-free prefix of the output.
    pub async fn run<S, K>(
        mut self,
        source: &mut S,
        sink: &mut K,
        accumulation_threshold: usize,
        options: TranslationOptions,
    ) -> Result<RunSummary, PipelineError>
    where
        S: LineSource + ?Sized,
        K: LineSink + ?Sized,
    {
        if accumulation_threshold == 0 {
            return Err(PipelineError::Config(
                "accumulation threshold must be greater than 0".to_string(),
            ));
        }
        options.validate()?;
        let options = Arc::new(options);

        info!(
            accumulation_threshold,
            batch_type = ?options.batch_type,
            replicas = self.pool.replica_count(),
            max_in_flight = self.pool.max_in_flight(),
            "streaming"
        );

        let started = Instant::now();
        let mut progress = Progress {
            batch_type: options.batch_type,
            ..Default::default()
        };
        let streamed = self
            .stream(source, sink, accumulation_threshold, &options, &mut progress)
            .await;
        let flushed = sink.flush().await;
        if let Err(e) = &streamed {
            warn!(error = %e, lines_written = progress.lines_written, "run failed");
        }
        streamed?;
        flushed?;

        Ok(RunSummary {
            lines_read: progress.lines_read,
            lines_written: progress.lines_written,
            batches_submitted: progress.batches_submitted,
            cancelled: progress.cancelled,
            peak_in_flight: self.pool.peak_in_flight(),
            peak_held_back: progress.peak_held_back,
            elapsed: started.elapsed(),
        })
    }

    async fn stream<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        accumulation_threshold: usize,
        options: &Arc<TranslationOptions>,
        progress: &mut Progress,
    ) -> Result<(), PipelineError>
    where
        S: LineSource + ?Sized,
        K: LineSink + ?Sized,
    {
        let mut state = PipelineState::Reading;
        let mut batch = Batch::new();
        let mut line = String::new();
        let hold_limit = self.pool.max_in_flight();

        loop {
            // a line already read is still accumulated; cancellation is taken
            // up before the next read or wait
            if matches!(state, PipelineState::Reading | PipelineState::Draining)
                && !progress.cancelled
                && self.cancel.is_cancelled()
            {
                self.begin_cancel(batch.take().len(), progress).await;
                state = PipelineState::Draining;
            }

            let next = match state {
                PipelineState::Reading => {
                    if progress.reorder.pending_weight() >= hold_limit && progress.outstanding > 0 {
                        debug!(
                            held_back = progress.reorder.pending_len(),
                            waiting_on = progress.reorder.next_index(),
                            "reorder buffer full, pausing input"
                        );
                        self.drain_one(sink, progress).await?;
                        PipelineState::Reading
                    } else {
                        let woken = tokio::select! {
                            more = source.read_line(&mut line) => Woken::Ready(more),
                            _ = self.cancel.cancelled() => Woken::Cancelled,
                        };
                        match woken {
                            Woken::Ready(more) => {
                                if more? {
                                    PipelineState::Accumulating
                                } else {
                                    if !batch.is_empty() {
                                        self.submit(&mut batch, options, sink, progress).await?;
                                    }
                                    PipelineState::Draining
                                }
                            }
                            Woken::Completed(_) | Woken::Cancelled => PipelineState::Reading,
                        }
                    }
                }
                PipelineState::Accumulating => {
                    let tokens = self.codec.encode(&line)?;
                    batch.push(progress.lines_read, tokens);
                    progress.lines_read += 1;
                    if batch.size(options.batch_type) >= accumulation_threshold {
                        self.submit(&mut batch, options, sink, progress).await?;
                    }
                    while let Some(completion) = self.completions.try_next() {
                        self.consume(completion, sink, progress).await?;
                    }
                    PipelineState::Reading
                }
                PipelineState::Draining => {
                    if progress.outstanding == 0 {
                        PipelineState::Done
                    } else if progress.abandoned {
                        // keep what already arrived, stop waiting on the rest
                        while let Some(completion) = self.completions.try_next() {
                            self.consume(completion, sink, progress).await?;
                        }
                        PipelineState::Done
                    } else {
                        self.drain_one(sink, progress).await?;
                        PipelineState::Draining
                    }
                }
                PipelineState::Done => break,
            };
            if next != state && matches!(next, PipelineState::Draining | PipelineState::Done) {
                debug!(from = ?state, to = ?next, lines_read = progress.lines_read, outstanding = progress.outstanding, "pipeline state");
            }
            state = next;
        }
        Ok(())
    }

    // Admits and queues `batch` one inference batch at a time. Completions
    // that land while admission waits are written out meanwhile. On
    // cancellation the parts not yet queued are dropped.
    async fn submit<K>(
        &mut self,
        batch: &mut Batch,
        options: &Arc<TranslationOptions>,
        sink: &mut K,
        progress: &mut Progress,
    ) -> Result<(), PipelineError>
    where K: LineSink + ?Sized
    {
        let lines = batch.len();
        let mut parts = self.pool.split(batch.take(), options).into_iter();
        let mut jobs = 0;
        while let Some(part) = parts.next() {
            let admission = loop {
                let woken = tokio::select! {
                    admitted = self.pool.admit(&part, options) => Woken::Ready(admitted),
                    completion = self.completions.next() => Woken::Completed(completion),
                    _ = self.cancel.cancelled() => Woken::Cancelled,
                };
                match woken {
                    Woken::Ready(admitted) => break admitted?,
                    Woken::Completed(Some(completion)) => self.consume(completion, sink, progress).await?,
                    Woken::Completed(None) => return Err(pool_stopped(progress)),
                    Woken::Cancelled => {
                        let dropped = part.len() + parts.map(|p| p.len()).sum::<usize>();
                        debug!(dropped, jobs, "cancelled while waiting for admission");
                        return Ok(());
                    }
                }
            };
            self.pool.enqueue(part, options, admission).await;
            jobs += 1;
            progress.batches_submitted += 1;
            progress.outstanding += 1;
        }
        debug!(lines, jobs, "submitted batch");
        Ok(())
    }

    // Waits for one completion. Returns early, consuming nothing, when the
    // run is cancelled.
    async fn drain_one<K>(&mut self, sink: &mut K, progress: &mut Progress) -> Result<(), PipelineError>
    where K: LineSink + ?Sized
    {
        let woken: Woken<()> = if progress.cancelled {
            Woken::Completed(self.completions.next().await)
        } else {
            tokio::select! {
                completion = self.completions.next() => Woken::Completed(completion),
                _ = self.cancel.cancelled() => Woken::Cancelled,
            }
        };

        match woken {
            Woken::Completed(Some(completion)) => self.consume(completion, sink, progress).await,
            Woken::Completed(None) => Err(pool_stopped(progress)),
            Woken::Ready(()) | Woken::Cancelled => Ok(()),
        }
    }

    async fn begin_cancel(&mut self, released: usize, progress: &mut Progress) {
        progress.cancelled = true;
        warn!(
            released,
            outstanding = progress.outstanding,
            policy = ?self.config.on_cancel,
            "run cancelled"
        );
        if self.config.on_cancel == CancelPolicy::Abandon {
            let dropped = self.pool.abandon().await;
            debug!(dropped, "replica pool abandoned");
            progress.abandoned = true;
        }
    }

    async fn consume<K>(&mut self, completion: Completion, sink: &mut K, progress: &mut Progress) -> Result<(), PipelineError>
    where K: LineSink + ?Sized
    {
        progress.outstanding = progress.outstanding.saturating_sub(1);
        debug!(job = %completion.job_id, replica = completion.replica, lines = completion.indices.len(), "job completed");

        match completion.outcome {
            Ok(results) => {
                for (index, result) in completion.indices.into_iter().zip(results) {
                    let weight = match progress.batch_type {
                        BatchType::Examples => 1,
                        BatchType::Tokens => result.output().len().max(1),
                    };
                    let text = self.codec.decode(result.output())?;
                    progress.reorder.insert(index, text, weight);
                }
            }
            Err(e) => match &self.config.on_inference_error {
                InferenceErrorPolicy::Fail => {
                    return Err(PipelineError::inference(&completion.indices, &e));
                }
                InferenceErrorPolicy::Placeholder(placeholder) => {
                    warn!(lines = ?completion.indices, error = %e, "writing placeholders for failed batch");
                    for index in completion.indices {
                        progress.reorder.insert(index, placeholder.clone(), 1);
                    }
                }
            },
        }

        while let Some(line) = progress.reorder.pop_ready() {
            sink.write_line(&line).await?;
            progress.lines_written += 1;
        }
        progress.peak_held_back = progress.peak_held_back.max(progress.reorder.pending_len());
        Ok(())
    }
}

fn pool_stopped(progress: &Progress) -> PipelineError {
    PipelineError::inference(
        &[progress.reorder.next_index()],
        &InferenceError::new(format!(
            "replica pool stopped with {} batches outstanding",
            progress.outstanding
        )),
    )
}
