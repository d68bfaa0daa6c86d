use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounds how much work may be admitted to the pool but not yet returned.
///
/// The budget is counted in the run's batch unit (tokens or sequences).
/// [`AdmissionControl::admit`] waits until enough budget is free; the returned
/// [`Admission`] hands it back when dropped.
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    semaphore: Arc<Semaphore>,
    ceiling: usize,
    gauge: Arc<InFlightGauge>,
}

#[derive(Debug, Default)]
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionControl {
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
        Self {
            semaphore: Arc::new(Semaphore::new(ceiling)),
            ceiling,
            gauge: Arc::new(InFlightGauge::default()),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Amount currently admitted. Oversized requests count in full, so this
    /// can exceed the ceiling.
    pub fn in_flight(&self) -> usize {
        self.gauge.current.load(Ordering::SeqCst)
    }

    /// Highest amount ever admitted at once.
    pub fn peak(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    /// Waits for `amount` of budget.
    ///
    /// Requests larger than the ceiling wait for the whole ceiling instead,
    /// so an oversized batch runs alone rather than never. The gauge still
    /// records the full `amount`.
    pub async fn admit(&self, amount: usize) -> Result<Admission, AcquireError> {
        let permits = amount.clamp(1, self.ceiling);
        // ceiling is capped to u32::MAX in new()
        let permit = self.semaphore.clone().acquire_many_owned(permits as u32).await?;
        let now = self.gauge.current.fetch_add(amount, Ordering::SeqCst) + amount;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Admission {
            permit,
            amount,
            gauge: self.gauge.clone(),
        })
    }

    /// Fails every pending and future [`AdmissionControl::admit`] call.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Budget held by one admitted job.
#[derive(Debug)]
pub struct Admission {
    permit: OwnedSemaphorePermit,
    amount: usize,
    gauge: Arc<InFlightGauge>,
}

impl Admission {
    /// Amount requested, as counted by the in-flight gauge.
    pub fn amount(&self) -> usize {
        self.amount
    }

    /// Semaphore permits held; never more than the ceiling.
    pub fn permits(&self) -> usize {
        self.permit.num_permits()
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        // the permit itself is returned after this, when `permit` drops
        self.gauge.current.fetch_sub(self.amount, Ordering::SeqCst);
    }
}
