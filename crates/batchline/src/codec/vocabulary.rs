use std::collections::HashMap;
use std::path::Path;
use crate::error::PipelineError;

/// Token emitted by the engine for pieces it has no entry for.
pub const UNKNOWN_TOKEN: &str = "<unk>";

/// An ordered token table.
///
/// Entry `i` is the token the engine uses for index `i`; every index maps to
/// exactly one token string and no string appears twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(PipelineError::Vocabulary("vocabulary is empty".to_string()));
        }
        let mut ids = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            if let Some(previous) = ids.insert(token.clone(), id) {
                return Err(PipelineError::Vocabulary(format!(
                    "token '{token}' appears at indices {previous} and {id}"
                )));
            }
        }
        Ok(Self { tokens, ids })
    }

    /// Reads one token per line; line `i` is index `i`.
    ///
    /// Only the line terminator is stripped. A blank line would shift every
    /// later index, so it is rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(PipelineError::io(format!("reading vocabulary {}", path.display())))?;
        let mut tokens = Vec::new();
        for (line_number, line) in content.lines().enumerate() {
            if line.is_empty() {
                return Err(PipelineError::Vocabulary(format!(
                    "{}: line {} is blank",
                    path.display(),
                    line_number + 1
                )));
            }
            tokens.push(line);
        }
        Self::from_tokens(tokens)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn to_token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn to_id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    /// Tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}
