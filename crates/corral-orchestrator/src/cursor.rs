//! Round-robin scheduling cursor.
//!
//! One cursor per orchestrator, advanced on every scheduling decision
//! regardless of which project asked. Mutated only through `&mut`, so it
//! is serialized together with the rest of the orchestrator state.

/// Selects indices into a candidate list, wrapping around its length.
#[derive(Debug, Default, Clone)]
pub struct RoundRobinCursor {
    position: usize,
}

impl RoundRobinCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the next index, wrapping around `count`.
    ///
    /// Returns `None` if count is zero; the cursor does not move then.
    pub fn next(&mut self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        let idx = self.position % count;
        self.position = self.position.wrapping_add(1);
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_indices() {
        let mut cursor = RoundRobinCursor::new();

        assert_eq!(cursor.next(3), Some(0));
        assert_eq!(cursor.next(3), Some(1));
        assert_eq!(cursor.next(3), Some(2));
        assert_eq!(cursor.next(3), Some(0)); // wraps
        assert_eq!(cursor.next(3), Some(1));
    }

    #[test]
    fn zero_count_returns_none_without_advancing() {
        let mut cursor = RoundRobinCursor::new();
        assert_eq!(cursor.next(0), None);
        assert_eq!(cursor.next(3), Some(0));
    }

    #[test]
    fn single_candidate() {
        let mut cursor = RoundRobinCursor::new();
        for _ in 0..10 {
            assert_eq!(cursor.next(1), Some(0));
        }
    }

    #[test]
    fn adapts_to_changing_candidate_count() {
        let mut cursor = RoundRobinCursor::new();

        assert_eq!(cursor.next(2), Some(0));
        assert_eq!(cursor.next(2), Some(1));

        // Candidate list grows to 4.
        assert_eq!(cursor.next(4), Some(2));
        assert_eq!(cursor.next(4), Some(3));
        assert_eq!(cursor.next(4), Some(0));

        // And shrinks back to 2.
        assert_eq!(cursor.next(2), Some(1));
    }
}
