//! Lifecycle handle for one replica task.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use tokio::{task::JoinHandle, sync::Notify};

/// A handle for managing the background task that runs one replica.
///
/// The task receives a running flag and the pool's work notifier. It is
/// expected to exit once the flag turns `false`; [`ReplicaHandle::shutdown`]
/// flips the flag and wakes every waiting replica so it can notice.
///
/// # Example
///
/// ```ignore
/// let handle = ReplicaHandle::new(0, notifier.clone(), |running, notifier| {
///     tokio::spawn(async move {
///         while running.load(Ordering::SeqCst) {
///             notifier.notified().await;
///             // pull a job and run it
///         }
///     })
/// });
/// ```
pub struct ReplicaHandle {
    index: usize,

    /// Flag indicating whether the replica should keep pulling jobs
    running: Arc<AtomicBool>,

    /// Handle to the spawned task, `None` after shutdown or abort
    handle: Option<JoinHandle<()>>,

    /// Notifier shared by every replica of the pool
    notifier: Arc<Notify>,
}

impl ReplicaHandle {
    pub fn new<F>(index: usize, notifier: Arc<Notify>, task: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>, Arc<Notify>) -> JoinHandle<()>,
    {
        let running = Arc::new(AtomicBool::new(true));
        let handle = task(running.clone(), notifier.clone());

        Self {
            index,
            running,
            handle: Some(handle),
            notifier,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the task has exited (or was detached by a shutdown).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Asks the replica to stop after its current job.
    ///
    /// The task is detached; a job already running on it still completes and
    /// reports its result.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.notifier.notify_waiters();
        self.handle.take();
    }

    /// Stops the replica at its next suspension point, dropping any running job.
    pub fn abort(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ReplicaHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time;

    fn spin(notifier: Arc<Notify>, stopped: Arc<AtomicBool>) -> ReplicaHandle {
        ReplicaHandle::new(0, notifier, move |running, notifier| {
            tokio::spawn(async move {
                while running.load(Ordering::SeqCst) {
                    let _ = time::timeout(Duration::from_millis(100), notifier.notified()).await;
                }
                stopped.store(true, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn test_replica_starts_running() {
        let handle = spin(Arc::new(Notify::new()), Arc::new(AtomicBool::new(false)));
        assert!(handle.is_running());
        assert!(!handle.is_finished());
        assert_eq!(handle.index(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_wakes_and_stops_the_task() {
        let stopped = Arc::new(AtomicBool::new(false));
        let mut handle = spin(Arc::new(Notify::new()), stopped.clone());
        time::sleep(Duration::from_millis(10)).await;

        handle.shutdown();
        time::sleep(Duration::from_millis(20)).await;

        assert!(!handle.is_running());
        assert!(stopped.load(Ordering::SeqCst));
        assert!(handle.handle.is_none());
    }

    #[tokio::test]
    async fn test_drop_triggers_shutdown() {
        let stopped = Arc::new(AtomicBool::new(false));
        {
            let _handle = spin(Arc::new(Notify::new()), stopped.clone());
            time::sleep(Duration::from_millis(10)).await;
        }
        time::sleep(Duration::from_millis(20)).await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_abort_does_not_let_the_task_finish_its_loop() {
        let stopped = Arc::new(AtomicBool::new(false));
        let mut handle = spin(Arc::new(Notify::new()), stopped.clone());
        handle.abort();
        time::sleep(Duration::from_millis(20)).await;
        assert!(!stopped.load(Ordering::SeqCst));
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_multiple_shutdowns() {
        let mut handle = spin(Arc::new(Notify::new()), Arc::new(AtomicBool::new(false)));
        handle.shutdown();
        handle.shutdown();
        handle.abort();
        assert!(!handle.is_running());
    }
}
