//! Replica pool: a fixed set of inference replicas fed from one job queue.
//!
//! Every replica runs as its own tokio task and owns one [`Translator`].
//! Submitted batches are split to the
//! per-call budget, admitted against the in-flight ceiling, and queued; idle
//! replicas pick them up in submission order and report on a shared
//! [`CompletionStream`](crate::communication::CompletionStream).
//!
//! [`Translator`]: crate::engine::Translator

mod admission;
mod replica;
mod replica_pool;
mod worker;

pub use admission::{Admission, AdmissionControl};
pub use replica_pool::ReplicaPool;
pub use worker::ReplicaHandle;
