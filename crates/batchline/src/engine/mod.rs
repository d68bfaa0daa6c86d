//! # Inference Engine Interface
//!
//! The neural engine is an external collaborator. This module defines the
//! narrow surface the pipeline needs from it:
//!
//! * [`ModelLoader`] - loads a model for a device and compute type
//! * [`LoadedModel`] - the loaded handle, with a checked capability accessor
//!   for sequence-to-sequence models
//! * [`SequenceToSequenceModel`] - exposes vocabularies and builds replicas
//! * [`Translator`] - one replica, translating one batch at a time
//!
//! [`TranslationOptions`] are passed through to every replica unchanged.
//!
//! An [`echo`] engine is included for runs that only need to exercise the
//! pipeline.

mod core_trait;
mod model;
mod options;

pub mod echo;

pub use core_trait::{ModelLoader, SequenceToSequenceModel, TranslationResult, Translator};
pub use model::LoadedModel;
pub use options::{BatchType, TranslationOptions};

#[cfg(test)]
/// Scriptable stub engine.
pub(crate) mod mock_engine;
