use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::error::Elapsed;
use tracing::{debug, error};
use crate::communication::{Completion, Job};
use crate::engine::{TranslationOptions, TranslationResult, Translator};
use crate::error::InferenceError;

/// Pulls jobs off the shared queue and runs them one at a time on `translator`.
///
/// Exits when `running` turns false or when nobody listens for completions
/// anymore. A job's admission budget is released once its completion has
/// been sent.
pub(crate) async fn replica_loop(
    replica: usize,
    mut translator: Box<dyn Translator>,
    running: Arc<AtomicBool>,
    notifier: Arc<Notify>,
    waiting_jobs: Arc<Mutex<VecDeque<Job>>>,
    completions: mpsc::UnboundedSender<Completion>,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let (job, more_waiting) = {
            let mut jobs = waiting_jobs.lock().await;
            let job = jobs.pop_front();
            (job, !jobs.is_empty())
        };

        let Some(job) = job else {
            // No work to do, wait for notification or check periodically
            let _ = timeout_await_notifier(&notifier).await;
            continue;
        };
        if more_waiting {
            // pass the wake-up on so an idle replica picks up the rest
            notifier.notify_one();
        }

        let (job_id, batch, options, admission) = job.into_parts();
        let (indices, source) = batch.into_parts();
        debug!(replica, job = %job_id, sequences = source.len(), "running job");

        let outcome = run_translation(translator.as_mut(), &source, &options).await;
        if let Err(e) = &outcome {
            error!(replica, job = %job_id, error = %e, "job failed");
        }

        let completion = Completion {
            job_id,
            replica,
            indices,
            outcome,
        };
        let delivered = completions.send(completion).is_ok();
        drop(admission);
        if !delivered {
            debug!(replica, "completion receiver dropped, stopping replica");
            break;
        }
    }
    debug!(replica, "replica stopped");
}

async fn run_translation(
    translator: &mut dyn Translator,
    source: &[Vec<String>],
    options: &TranslationOptions,
) -> Result<Vec<TranslationResult>, InferenceError> {
    let result = AssertUnwindSafe(translator.translate_batch(source, options))
        .catch_unwind()
        .await;
    match result {
        Ok(Ok(results)) if results.len() == source.len() => Ok(results),
        Ok(Ok(results)) => Err(InferenceError::new(format!(
            "engine returned {} results for {} sequences",
            results.len(),
            source.len()
        ))),
        Ok(Err(e)) => Err(e),
        Err(panic) => Err(InferenceError::new(format!(
            "replica panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[inline]
async fn timeout_await_notifier(notifier: &Notify) -> Result<(), Elapsed> {
    tokio::time::timeout(
        Duration::from_millis(100),
        notifier.notified(),
    ).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::communication::Batch;
    use crate::engine::mock_engine::{ReversingModel, Script};
    use crate::pool::AdmissionControl;

    async fn job(control: &AdmissionControl, weight: usize, lines: Vec<(usize, Vec<&str>)>) -> Job {
        let mut batch = Batch::new();
        for (index, tokens) in lines {
            batch.push(index, tokens.into_iter().map(String::from).collect());
        }
        let admission = control.admit(weight).await.unwrap();
        Job::new(batch, Arc::new(TranslationOptions::default()), admission)
    }

    fn spawn_replica(
        translator: Box<dyn Translator>,
        queue: Arc<Mutex<VecDeque<Job>>>,
    ) -> (Arc<AtomicBool>, Arc<Notify>, mpsc::UnboundedReceiver<Completion>) {
        let running = Arc::new(AtomicBool::new(true));
        let notifier = Arc::new(Notify::new());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(replica_loop(0, translator, running.clone(), notifier.clone(), queue, tx));
        (running, notifier, rx)
    }

    #[tokio::test]
    async fn test_replica_runs_queued_jobs_in_order() {
        let model = ReversingModel::new(["<unk>"]);
        let control = AdmissionControl::new(10);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        queue.lock().await.push_back(job(&control, 2, vec![(0, vec!["a", "b"])]).await);
        queue.lock().await.push_back(job(&control, 1, vec![(1, vec!["c"])]).await);

        let (running, notifier, mut rx) = spawn_replica(Box::new(model.translator()), queue);
        notifier.notify_one();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.indices, vec![0]);
        assert_eq!(first.outcome.unwrap()[0].output(), ["b".to_string(), "a".to_string()].as_slice());
        let second = rx.recv().await.unwrap();
        assert_eq!(second.indices, vec![1]);

        tokio::task::yield_now().await;
        assert_eq!(control.in_flight(), 0);
        running.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn test_engine_error_is_reported_for_that_job_only() {
        let model = ReversingModel::with_script(["<unk>"], Script {
            fail_token: Some("bad".into()),
            ..Default::default()
        });
        let control = AdmissionControl::new(10);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        queue.lock().await.push_back(job(&control, 1, vec![(0, vec!["bad"])]).await);
        queue.lock().await.push_back(job(&control, 1, vec![(1, vec!["ok"])]).await);

        let (_running, notifier, mut rx) = spawn_replica(Box::new(model.translator()), queue);
        notifier.notify_one();

        assert!(rx.recv().await.unwrap().outcome.is_err());
        assert!(rx.recv().await.unwrap().outcome.is_ok());
    }

    #[tokio::test]
    async fn test_panic_becomes_inference_error_and_replica_survives() {
        let model = ReversingModel::with_script(["<unk>"], Script {
            panic_token: Some("boom".into()),
            ..Default::default()
        });
        let control = AdmissionControl::new(10);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        queue.lock().await.push_back(job(&control, 1, vec![(0, vec!["boom"])]).await);
        queue.lock().await.push_back(job(&control, 1, vec![(1, vec!["fine"])]).await);

        let (_running, notifier, mut rx) = spawn_replica(Box::new(model.translator()), queue);
        notifier.notify_one();

        let failed = rx.recv().await.unwrap();
        let message = failed.outcome.unwrap_err().message().to_string();
        assert!(message.contains("replica blew up"), "{message}");
        assert!(rx.recv().await.unwrap().outcome.is_ok());
    }

    struct ShortChanging;

    #[async_trait]
    impl Translator for ShortChanging {
        async fn translate_batch(
            &mut self,
            _source: &[Vec<String>],
            _options: &TranslationOptions,
        ) -> Result<Vec<TranslationResult>, InferenceError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_result_count_mismatch_is_an_error() {
        let control = AdmissionControl::new(10);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        queue.lock().await.push_back(job(&control, 2, vec![(0, vec!["x"]), (1, vec!["y"])]).await);

        let (_running, notifier, mut rx) = spawn_replica(Box::new(ShortChanging), queue);
        notifier.notify_one();

        let completion = rx.recv().await.unwrap();
        assert!(completion.outcome.unwrap_err().message().contains("0 results for 2 sequences"));
    }

    #[tokio::test]
    async fn test_replica_stops_when_flag_cleared() {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let (running, notifier, mut rx) = spawn_replica(Box::new(ShortChanging), queue);
        running.store(false, Ordering::SeqCst);
        notifier.notify_waiters();
        // the loop exits and drops its sender
        assert!(rx.recv().await.is_none());
    }
}
