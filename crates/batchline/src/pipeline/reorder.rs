use std::collections::BTreeMap;

/// Holds decoded lines that finished ahead of an earlier line.
///
/// Lines come in keyed by input index in any order and leave strictly in
/// ascending index order with no gaps. Each line carries a weight, in the
/// run's batch unit, so callers can bound what is held back.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    next_index: usize,
    pending: BTreeMap<usize, (String, usize)>,
    pending_weight: usize,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers the line for `index`.
    ///
    /// Indices already released, or already buffered, are ignored and `false`
    /// is returned.
    pub fn insert(&mut self, index: usize, line: String, weight: usize) -> bool {
        if index < self.next_index || self.pending.contains_key(&index) {
            return false;
        }
        self.pending.insert(index, (line, weight));
        self.pending_weight += weight;
        true
    }

    /// Releases the line for the next index, if it has arrived.
    pub fn pop_ready(&mut self) -> Option<String> {
        let (line, weight) = self.pending.remove(&self.next_index)?;
        self.next_index += 1;
        self.pending_weight -= weight;
        Some(line)
    }

    /// Index of the next line to be released.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Lines buffered behind a gap.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total weight of the lines buffered behind a gap.
    pub fn pending_weight(&self) -> usize {
        self.pending_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_lines_leave_in_order() {
        let mut buffer = ReorderBuffer::new();
        buffer.insert(2, "c".into(), 1);
        buffer.insert(1, "b".into(), 1);
        assert_eq!(buffer.pop_ready(), None);
        assert_eq!(buffer.pending_len(), 2);

        buffer.insert(0, "a".into(), 1);
        let released: Vec<String> = std::iter::from_fn(|| buffer.pop_ready()).collect();
        assert_eq!(released, vec!["a", "b", "c"]);
        assert_eq!(buffer.next_index(), 3);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_weight_follows_buffered_lines() {
        let mut buffer = ReorderBuffer::new();
        buffer.insert(1, "bb".into(), 2);
        buffer.insert(2, "ccc".into(), 3);
        assert_eq!(buffer.pending_weight(), 5);

        buffer.insert(0, "a".into(), 1);
        assert_eq!(buffer.pop_ready().as_deref(), Some("a"));
        assert_eq!(buffer.pending_weight(), 5);
        buffer.pop_ready();
        assert_eq!(buffer.pending_weight(), 3);
        buffer.pop_ready();
        assert_eq!(buffer.pending_weight(), 0);
    }

    #[test]
    fn test_gap_holds_back_later_lines() {
        let mut buffer = ReorderBuffer::new();
        buffer.insert(0, "a".into(), 1);
        buffer.insert(2, "c".into(), 1);
        assert_eq!(buffer.pop_ready().as_deref(), Some("a"));
        assert_eq!(buffer.pop_ready(), None);
        assert_eq!(buffer.next_index(), 1);
    }

    #[test]
    fn test_duplicates_and_released_indices_are_ignored() {
        let mut buffer = ReorderBuffer::new();
        assert!(buffer.insert(0, "a".into(), 1));
        assert!(!buffer.insert(0, "again".into(), 1));
        buffer.pop_ready();
        assert!(!buffer.insert(0, "late".into(), 1));
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(buffer.pending_weight(), 0);
    }
}
