//! # Line Codec
//!
//! Converts between lines of text and the subword tokens the engine consumes.
//!
//! The [`SubwordTokenizer`] trait is the seam to the segmentation model. The
//! crate ships a [`GreedySubwordTokenizer`] that reads a SentencePiece-style
//! piece list, and, behind the `tokenizers` feature, an adapter over Hugging
//! Face tokenizers.
//!
//! [`LineCodec`] wraps a tokenizer and enforces the coupling with the engine:
//! it refuses to encode until it has been given the engine's source
//! [`Vocabulary`], and it renders the engine's raw unknown token as a readable
//! marker when decoding.

mod core_trait;
mod greedy;
mod line_codec;
mod vocabulary;

#[cfg_attr(docsrs, doc(cfg(feature = "tokenizers")))]
#[cfg(feature = "tokenizers")]
/// Hugging Face tokenizer adapter.
///
/// Only available with the `tokenizers` feature.
pub mod huggingface;

pub use core_trait::SubwordTokenizer;
pub use greedy::{GreedySubwordTokenizer, WORD_BOUNDARY};
pub use line_codec::{normalize_unknown, LineCodec, DEFAULT_UNKNOWN_MARKER};
pub use vocabulary::{Vocabulary, UNKNOWN_TOKEN};

#[cfg(test)]
/// Stub tokenizers for tests.
pub(crate) mod mock_tokenizer;
