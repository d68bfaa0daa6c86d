use serde::{Deserialize, Serialize};
use crate::error::PipelineError;
use super::device::{ComputeType, DeviceClass};

/// Tuning constants for [`DevicePolicy`].
///
/// The values encode throughput tuning for particular hardware, not
/// correctness requirements, so every field can be overridden from a config
/// file. Batch budgets are in the unit of the run's
/// [`BatchType`](crate::engine::BatchType) (tokens by default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefaults {
    /// Per-call batch budget when running on an accelerator.
    pub accelerator_max_batch_size: usize,
    /// Per-call batch budget on a single CPU core.
    pub single_core_max_batch_size: usize,
    /// Per-call batch budget for each replica on a multi-core CPU.
    pub multi_core_max_batch_size: usize,
    /// Threads given to each replica on a multi-core CPU.
    pub threads_per_replica: usize,
    /// The pipeline reads ahead `max_batch_size * read_ahead_factor` before dispatching.
    pub read_ahead_factor: usize,
    /// The in-flight ceiling is `replicas * max_batch_size * in_flight_factor`.
    pub in_flight_factor: usize,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            accelerator_max_batch_size: 6000,
            single_core_max_batch_size: 512,
            multi_core_max_batch_size: 256,
            threads_per_replica: 2,
            read_ahead_factor: 8,
            in_flight_factor: 2,
        }
    }
}

/// How the replica pool and the pipeline are sized for one run.
///
/// Built once by [`DevicePolicy::select`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub device: DeviceClass,
    pub replicas: usize,
    pub threads_per_replica: usize,
    pub compute_type: ComputeType,
    /// Budget of a single inference call.
    pub max_batch_size: usize,
    /// Ceiling on tokens (or sequences) admitted to the pool but not yet returned.
    pub max_in_flight: usize,
    /// Default accumulation threshold for the pipeline.
    pub read_ahead: usize,
}

/// Picks replica count, threads, precision and batch budgets for a device.
#[derive(Debug, Clone, Default)]
pub struct DevicePolicy {
    defaults: PolicyDefaults,
}

impl DevicePolicy {
    pub fn new(defaults: PolicyDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &PolicyDefaults {
        &self.defaults
    }

    /// Selects an [`ExecutionProfile`] for `device` and `core_count`.
    ///
    /// Device strings that are not recognised fall into the CPU branch. The
    /// only error is a core count below one.
    ///
    /// ```
    /// use batchline::policy::{ComputeType, DevicePolicy};
    ///
    /// let policy = DevicePolicy::default();
    /// let profile = policy.select("cpu", 8).unwrap();
    /// assert_eq!((profile.replicas, profile.threads_per_replica), (4, 2));
    /// assert_eq!(profile.compute_type, ComputeType::Int8);
    /// ```
    pub fn select(&self, device: &str, core_count: i64) -> Result<ExecutionProfile, PipelineError> {
        self.select_for(DeviceClass::resolve_lenient(device, 0), core_count)
    }

    /// Same as [`DevicePolicy::select`] for an already resolved device class.
    pub fn select_for(&self, device: DeviceClass, core_count: i64) -> Result<ExecutionProfile, PipelineError> {
        if core_count < 1 {
            return Err(PipelineError::Config(format!(
                "core count must be positive, got {core_count}"
            )));
        }
        let d = &self.defaults;

        let (replicas, threads_per_replica, compute_type, max_batch_size) = if device.is_accelerator() {
            (1, 1, ComputeType::Float16, d.accelerator_max_batch_size)
        } else if core_count == 1 {
            (1, 1, ComputeType::Int8, d.single_core_max_batch_size)
        } else {
            let threads = d.threads_per_replica.max(1);
            let replicas = (core_count as usize / threads).max(1);
            (replicas, threads, ComputeType::Int8, d.multi_core_max_batch_size)
        };

        let max_batch_size = max_batch_size.max(1);
        let profile = ExecutionProfile {
            device,
            replicas,
            threads_per_replica,
            compute_type,
            max_batch_size,
            max_in_flight: replicas * max_batch_size * d.in_flight_factor.max(1),
            read_ahead: max_batch_size * d.read_ahead_factor.max(1),
        };
        tracing::debug!(?profile, core_count, "selected execution profile");
        Ok(profile)
    }
}
