use std::collections::HashSet;
use std::path::Path;
use crate::error::PipelineError;
use super::core_trait::SubwordTokenizer;
use super::vocabulary::{Vocabulary, UNKNOWN_TOKEN};

/// Marks the start of a word inside a piece, as SentencePiece does.
pub const WORD_BOUNDARY: char = '\u{2581}';

/// Greedy longest-match subword tokenizer over a SentencePiece-style piece list.
///
/// Every whitespace-separated word is prefixed with [`WORD_BOUNDARY`] and then
/// consumed left to right, always taking the longest allowed piece. A run of
/// characters that no piece covers becomes a single unknown token.
#[derive(Debug, Clone)]
pub struct GreedySubwordTokenizer {
    pieces: Vec<String>,
    allowed: HashSet<String>,
    max_piece_chars: usize,
}

impl GreedySubwordTokenizer {
    pub fn from_pieces<I, S>(pieces: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pieces: Vec<String> = pieces.into_iter().map(Into::into).filter(|p: &String| !p.is_empty()).collect();
        if pieces.is_empty() {
            return Err(PipelineError::Vocabulary("tokenizer model has no pieces".to_string()));
        }
        let allowed: HashSet<String> = pieces.iter().cloned().collect();
        let max_piece_chars = max_chars(&allowed);
        Ok(Self {
            pieces,
            allowed,
            max_piece_chars,
        })
    }

    /// Loads a `piece<TAB>score` list, one piece per line. Scores are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Vocabulary(format!("unable to open tokenizer model {}: {e}", path.display()))
        })?;
        Self::from_pieces(
            content
                .lines()
                .filter_map(|line| line.split('\t').next())
                .map(str::to_string),
        )
    }

    /// Number of pieces the tokenizer may currently emit.
    pub fn allowed_len(&self) -> usize {
        self.allowed.len()
    }

    fn encode_word(&self, word: &str, out: &mut Vec<String>) {
        let chars: Vec<char> = std::iter::once(WORD_BOUNDARY).chain(word.chars()).collect();
        let mut start = 0;
        let mut in_unknown_run = false;

        while start < chars.len() {
            let longest = self.max_piece_chars.min(chars.len() - start);
            let matched = (1..=longest).rev().find_map(|len| {
                let candidate: String = chars[start..start + len].iter().collect();
                self.allowed.contains(&candidate).then_some((candidate, len))
            });

            match matched {
                Some((piece, len)) => {
                    out.push(piece);
                    start += len;
                    in_unknown_run = false;
                }
                // an uncovered boundary marker is dropped rather than reported
                None if start == 0 => start += 1,
                None => {
                    if !in_unknown_run {
                        out.push(UNKNOWN_TOKEN.to_string());
                        in_unknown_run = true;
                    }
                    start += 1;
                }
            }
        }
    }
}

fn max_chars(pieces: &HashSet<String>) -> usize {
    pieces.iter().map(|p| p.chars().count()).max().unwrap_or(1)
}

impl SubwordTokenizer for GreedySubwordTokenizer {
    fn set_vocabulary(&mut self, vocabulary: &Vocabulary) -> Result<(), PipelineError> {
        if !vocabulary.contains(UNKNOWN_TOKEN) {
            return Err(PipelineError::Vocabulary(format!(
                "engine vocabulary has no '{UNKNOWN_TOKEN}' entry"
            )));
        }
        let allowed: HashSet<String> = self
            .pieces
            .iter()
            .filter(|piece| vocabulary.contains(piece))
            .cloned()
            .collect();
        if allowed.is_empty() {
            return Err(PipelineError::Vocabulary(
                "no tokenizer piece appears in the engine vocabulary".to_string(),
            ));
        }
        self.max_piece_chars = max_chars(&allowed);
        self.allowed = allowed;
        Ok(())
    }

    fn encode(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        let mut out = Vec::new();
        for word in text.split_whitespace() {
            self.encode_word(word, &mut out);
        }
        Ok(out)
    }

    fn decode(&self, pieces: &[String]) -> Result<String, PipelineError> {
        let joined = pieces.concat().replace(WORD_BOUNDARY, " ");
        Ok(joined.strip_prefix(' ').unwrap_or(&joined).to_string())
    }
}
