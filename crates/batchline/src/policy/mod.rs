//! # Device Policy
//!
//! Decides how a run is laid out before any I/O happens: how many replicas
//! to start, how many threads each one gets, which numeric precision the
//! engine should load the model in, and how large batches may grow.
//!
//! The shape of the policy:
//!
//! - an accelerator gets exactly one half-precision replica and a large batch budget
//! - a single CPU core gets one single-threaded replica and a small budget
//! - anything else gets `cores / 2` two-threaded replicas and a moderate budget
//!
//! The exact numbers live in [`PolicyDefaults`] and may be retuned.

mod device;
mod profile;

pub use device::{ComputeType, DeviceClass};
pub use profile::{DevicePolicy, ExecutionProfile, PolicyDefaults};
