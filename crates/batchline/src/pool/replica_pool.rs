use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info, warn};
use crate::communication::{Batch, CompletionStream, Job};
use crate::engine::{SequenceToSequenceModel, TranslationOptions, Translator};
use crate::error::{InferenceError, PipelineError};
use crate::policy::ExecutionProfile;
use super::admission::{Admission, AdmissionControl};
use super::replica::replica_loop;
use super::worker::ReplicaHandle;

/// A fixed set of replicas sharing one job queue.
///
/// Batches go in through [`ReplicaPool::submit`]; results come out of the
/// [`CompletionStream`] returned at construction, in completion order. Any
/// idle replica takes the next queued job, and each replica runs one job at a
/// time.
///
/// Submission is admission-controlled: a job enters the queue only once its
/// size fits under the in-flight ceiling, so a fast reader cannot pile up
/// unbounded work in front of slow replicas.
///
/// Dropping the pool asks every replica to stop after its current job.
pub struct ReplicaPool {
    /// Jobs admitted but not yet picked up by a replica
    waiting_jobs: Arc<Mutex<VecDeque<Job>>>,

    /// Wakes idle replicas when a job is queued
    work_notifier: Arc<Notify>,

    admission: AdmissionControl,

    replicas: Vec<ReplicaHandle>,

    /// Per-call budget used when the options don't set one
    max_batch_size: usize,
}

impl ReplicaPool {
    /// Starts `profile.replicas` replicas of `model`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        model: &dyn SequenceToSequenceModel,
        profile: &ExecutionProfile,
    ) -> Result<(Self, CompletionStream), PipelineError> {
        let translators = (0..profile.replicas)
            .map(|_| model.create_replica(profile.threads_per_replica))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            replicas = profile.replicas,
            threads_per_replica = profile.threads_per_replica,
            max_batch_size = profile.max_batch_size,
            max_in_flight = profile.max_in_flight,
            "starting replica pool"
        );
        Self::from_translators(translators, profile.max_batch_size, profile.max_in_flight)
    }

    /// Starts one replica per translator.
    pub fn from_translators(
        translators: Vec<Box<dyn Translator>>,
        max_batch_size: usize,
        max_in_flight: usize,
    ) -> Result<(Self, CompletionStream), PipelineError> {
        if translators.is_empty() {
            return Err(PipelineError::Config("a replica pool needs at least one replica".to_string()));
        }

        let waiting_jobs = Arc::new(Mutex::new(VecDeque::new()));
        let work_notifier = Arc::new(Notify::new());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let replicas = translators
            .into_iter()
            .enumerate()
            .map(|(index, translator)| {
                let waiting_jobs = waiting_jobs.clone();
                let completions = completions_tx.clone();
                ReplicaHandle::new(index, work_notifier.clone(), move |running, notifier| {
                    tokio::spawn(replica_loop(
                        index,
                        translator,
                        running,
                        notifier,
                        waiting_jobs,
                        completions,
                    ))
                })
            })
            .collect();

        let pool = Self {
            waiting_jobs,
            work_notifier,
            admission: AdmissionControl::new(max_in_flight),
            replicas,
            max_batch_size,
        };
        Ok((pool, CompletionStream::new(completions_rx)))
    }

    /// Splits `batch` into inference batches and queues them.
    ///
    /// Waits whenever the in-flight ceiling is reached. Returns the number of
    /// jobs queued; each produces exactly one completion unless the pool is
    /// abandoned first.
    pub async fn submit(&self, batch: Batch, options: &Arc<TranslationOptions>) -> Result<usize, PipelineError> {
        let mut queued = 0;
        for batch in self.split(batch, options) {
            let admission = self.admit(&batch, options).await?;
            self.enqueue(batch, options, admission).await;
            queued += 1;
        }
        Ok(queued)
    }

    /// Splits `batch` to the per-call budget: the options' when set, the
    /// pool's otherwise.
    ///
    /// The pieces come back ordered by their first line so the oldest lines
    /// are admitted first.
    pub fn split(&self, batch: Batch, options: &TranslationOptions) -> Vec<Batch> {
        let budget = if options.max_batch_size > 0 {
            options.max_batch_size
        } else {
            self.max_batch_size
        };
        let mut batches = batch.rebatch(budget, options.batch_type);
        batches.sort_by_key(|b| b.indices().into_iter().min());
        batches
    }

    /// Waits until `batch` fits under the in-flight ceiling.
    ///
    /// Fails once the pool has been abandoned.
    pub async fn admit(&self, batch: &Batch, options: &TranslationOptions) -> Result<Admission, PipelineError> {
        self.admission
            .admit(batch.size(options.batch_type))
            .await
            .map_err(|_| {
                PipelineError::inference(&batch.indices(), &InferenceError::new("replica pool was shut down"))
            })
    }

    /// Queues an admitted batch and wakes an idle replica.
    pub async fn enqueue(&self, batch: Batch, options: &Arc<TranslationOptions>, admission: Admission) {
        let job = Job::new(batch, options.clone(), admission);
        debug!(job = %job.id(), sequences = job.batch().len(), amount = job.admission().amount(), "queueing job");
        self.waiting_jobs.lock().await.push_back(job);
        self.work_notifier.notify_one();
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Budget currently admitted and not yet returned.
    pub fn in_flight(&self) -> usize {
        self.admission.in_flight()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.admission.peak()
    }

    pub fn max_in_flight(&self) -> usize {
        self.admission.ceiling()
    }

    /// Jobs queued but not yet picked up by a replica.
    pub async fn queued(&self) -> usize {
        self.waiting_jobs.lock().await.len()
    }

    /// Drops queued jobs and stops replicas without waiting for running jobs.
    ///
    /// Returns the number of queued jobs that were dropped.
    pub async fn abandon(&mut self) -> usize {
        self.admission.close();
        let dropped = {
            let mut jobs = self.waiting_jobs.lock().await;
            let dropped = jobs.len();
            jobs.clear();
            dropped
        };
        for replica in self.replicas.iter_mut() {
            replica.abort();
        }
        if dropped > 0 {
            warn!(dropped, "abandoned queued jobs");
        }
        dropped
    }

    /// Asks every replica to stop once its current job is done.
    pub fn shutdown(&mut self) {
        for replica in self.replicas.iter_mut() {
            replica.shutdown();
        }
    }
}

impl Drop for ReplicaPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
