use std::cmp::Reverse;
use crate::engine::BatchType;

/// A tokenized line, tagged with its position in the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub index: usize,
    pub tokens: Vec<String>,
}

impl Example {
    fn size(&self, batch_type: BatchType) -> usize {
        match batch_type {
            BatchType::Examples => 1,
            // an empty line still costs a slot
            BatchType::Tokens => self.tokens.len().max(1),
        }
    }
}

/// An ordered group of examples submitted together.
///
/// The batch keeps the line index of every example so results can be put
/// back in input order no matter how the batch is split or when it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    examples: Vec<Example>,
    num_tokens: usize,
    token_units: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, tokens: Vec<String>) {
        self.num_tokens += tokens.len();
        self.token_units += tokens.len().max(1);
        self.examples.push(Example { index, tokens });
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn num_tokens(&self) -> usize {
        self.num_tokens
    }

    /// Size in the unit of `batch_type`.
    ///
    /// In tokens every example counts for at least one, so empty lines still
    /// fill batches up.
    pub fn size(&self, batch_type: BatchType) -> usize {
        match batch_type {
            BatchType::Examples => self.len(),
            BatchType::Tokens => self.token_units,
        }
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn indices(&self) -> Vec<usize> {
        self.examples.iter().map(|e| e.index).collect()
    }

    /// Moves the contents out, leaving an empty batch behind.
    pub fn take(&mut self) -> Batch {
        std::mem::take(self)
    }

    /// Splits into line indices and token sequences, index-aligned.
    pub fn into_parts(self) -> (Vec<usize>, Vec<Vec<String>>) {
        self.examples.into_iter().map(|e| (e.index, e.tokens)).unzip()
    }

    /// Splits the batch into batches no larger than `max_batch_size`.
    ///
    /// Examples are ordered longest first before splitting so each inference
    /// call sees sequences of similar length. An example that alone exceeds
    /// the budget gets a batch of its own. A budget of `0` disables splitting.
    pub fn rebatch(self, max_batch_size: usize, batch_type: BatchType) -> Vec<Batch> {
        if self.is_empty() {
            return vec![];
        }
        if max_batch_size == 0 || self.size(batch_type) <= max_batch_size {
            return vec![self];
        }

        let mut examples = self.examples;
        examples.sort_by_key(|e| Reverse(e.tokens.len()));

        let mut batches = vec![];
        let mut current = Batch::new();
        for example in examples {
            let size = example.size(batch_type);
            if !current.is_empty() && current.size(batch_type) + size > max_batch_size {
                batches.push(current.take());
            }
            current.push(example.index, example.tokens);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("t{i}")).collect()
    }

    fn batch(lengths: &[usize]) -> Batch {
        let mut b = Batch::new();
        for (index, &len) in lengths.iter().enumerate() {
            b.push(index, tokens(len));
        }
        b
    }

    #[test]
    fn test_sizes() {
        let b = batch(&[3, 0, 2]);
        assert_eq!(b.len(), 3);
        assert_eq!(b.size(BatchType::Examples), 3);
        assert_eq!(b.size(BatchType::Tokens), 6);
        assert_eq!(b.num_tokens(), 5);
    }

    #[test]
    fn test_empty_lines_fill_a_token_budget() {
        let b = batch(&[0, 0, 0, 0, 0]);
        assert_eq!(b.num_tokens(), 0);
        assert_eq!(b.size(BatchType::Tokens), 5);
        let out = b.rebatch(2, BatchType::Tokens);
        assert_eq!(out.iter().map(Batch::len).collect::<Vec<_>>(), vec![2, 2, 1]);
    }

    #[test]
    fn test_take_resets() {
        let mut b = batch(&[1, 1]);
        let taken = b.take();
        assert!(b.is_empty());
        assert_eq!(b.num_tokens(), 0);
        assert_eq!(taken.indices(), vec![0, 1]);
    }

    #[test]
    fn test_rebatch_within_budget_is_untouched() {
        let b = batch(&[2, 2, 2]);
        let out = b.clone().rebatch(6, BatchType::Tokens);
        assert_eq!(out, vec![b]);
        assert!(Batch::new().rebatch(4, BatchType::Tokens).is_empty());
    }

    #[test]
    fn test_rebatch_by_tokens_sorts_longest_first() {
        let out = batch(&[1, 4, 2, 3]).rebatch(5, BatchType::Tokens);
        let groups: Vec<Vec<usize>> = out.iter().map(Batch::indices).collect();
        assert_eq!(groups, vec![vec![1], vec![3, 2], vec![0]]);
        assert!(out.iter().all(|b| b.size(BatchType::Tokens) <= 5));
    }

    #[test]
    fn test_rebatch_oversized_example_stands_alone() {
        let out = batch(&[9, 1, 1]).rebatch(4, BatchType::Tokens);
        let groups: Vec<Vec<usize>> = out.iter().map(Batch::indices).collect();
        assert_eq!(groups, vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_rebatch_by_examples() {
        let out = batch(&[1, 1, 1, 1, 1]).rebatch(2, BatchType::Examples);
        assert_eq!(out.iter().map(Batch::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        let mut all: Vec<usize> = out.into_iter().flat_map(|b| b.indices()).collect();
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_into_parts_is_index_aligned() {
        let mut b = Batch::new();
        b.push(7, vec!["a".into()]);
        b.push(3, vec!["b".into(), "c".into()]);
        let (indices, sequences) = b.into_parts();
        assert_eq!(indices, vec![7, 3]);
        assert_eq!(sequences[1], vec!["b".to_string(), "c".to_string()]);
    }
}
