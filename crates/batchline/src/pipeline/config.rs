use serde::{Deserialize, Serialize};
use crate::codec::{DEFAULT_UNKNOWN_MARKER, UNKNOWN_TOKEN};

/// What the pipeline does when a batch fails inside a replica.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceErrorPolicy {
    /// Stop the run with [`PipelineError::Inference`](crate::PipelineError::Inference).
    #[default]
    Fail,
    /// Write this text for every line of the failed batch and keep going.
    Placeholder(String),
}

/// What happens to submitted work when a run is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Wait for every submitted batch and write its lines.
    #[default]
    FinishInFlight,
    /// Drop queued batches, stop waiting on running ones.
    Abandon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub on_inference_error: InferenceErrorPolicy,
    pub on_cancel: CancelPolicy,
    /// Raw unknown token emitted by the engine.
    pub unknown_token: String,
    /// Text the unknown token is displayed as.
    pub unknown_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_inference_error: InferenceErrorPolicy::default(),
            on_cancel: CancelPolicy::default(),
            unknown_token: UNKNOWN_TOKEN.to_string(),
            unknown_marker: DEFAULT_UNKNOWN_MARKER.to_string(),
        }
    }
}
