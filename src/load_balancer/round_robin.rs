//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector.
/// Stores an internal cursor to rotate through a fixed-length list.
///
/// The cursor always holds the position the next scan starts from, already
/// reduced modulo the list length. Only [`RoundRobin::select`] moves it.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the index of the next eligible entry out of `len`.
    ///
    /// Scans at most `len` positions starting at the cursor. On success the
    /// cursor moves to one past the chosen index. Returns `None` when nothing
    /// is eligible, leaving the cursor where it was.
    ///
    /// Scan and advance commit through a single compare-and-swap, so
    /// concurrent callers see a strict rotation.
    pub fn select(&self, len: usize, eligible: impl Fn(usize) -> bool) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let mut start = self.cursor.load(Ordering::Acquire);
        loop {
            let found = (0..len)
                .map(|step| (start + step) % len)
                .find(|&index| eligible(index))?;

            match self.cursor.compare_exchange_weak(
                start,
                (found + 1) % len,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(found),
                Err(current) => start = current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let rr = RoundRobin::new();
        let picks: Vec<_> = (0..7).map(|_| rr.select(3, |_| true).unwrap()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_skips_ineligible() {
        let rr = RoundRobin::new();
        let picks: Vec<_> = (0..4).map(|_| rr.select(4, |i| i % 2 == 1).unwrap()).collect();
        assert_eq!(picks, vec![1, 3, 1, 3]);
    }

    #[test]
    fn test_nothing_eligible_terminates() {
        let rr = RoundRobin::new();
        assert_eq!(rr.select(1, |_| true), Some(0));
        assert_eq!(rr.select(3, |_| false), None);
    }

    #[test]
    fn test_empty() {
        let rr = RoundRobin::new();
        assert!(rr.select(0, |_| true).is_none());
    }
}
