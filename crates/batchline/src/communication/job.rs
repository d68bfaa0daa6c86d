use std::sync::Arc;
use uuid::Uuid;
use crate::engine::{TranslationOptions, TranslationResult};
use crate::error::InferenceError;
use crate::pool::Admission;
use super::batch::Batch;

/// An inference batch waiting for, or running on, a replica.
///
/// A job carries the admission budget it was granted; the budget returns to
/// the pool when the job's [`Completion`] has been emitted.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    batch: Batch,
    options: Arc<TranslationOptions>,
    admission: Admission,
}

impl Job {
    pub fn new(batch: Batch, options: Arc<TranslationOptions>, admission: Admission) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch,
            options,
            admission,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    pub fn into_parts(self) -> (Uuid, Batch, Arc<TranslationOptions>, Admission) {
        (self.id, self.batch, self.options, self.admission)
    }
}

/// Outcome of one job, as reported by the replica that ran it.
///
/// `indices[i]` is the input line whose translation is `results[i]`.
#[derive(Debug)]
pub struct Completion {
    pub job_id: Uuid,
    pub replica: usize,
    pub indices: Vec<usize>,
    pub outcome: Result<Vec<TranslationResult>, InferenceError>,
}
