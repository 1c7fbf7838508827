use std::sync::atomic::{AtomicU8, Ordering};

/// Upload percentage of a file.
///
/// `min(100, floor((sequence * chunk_size + acked) / file_size * 100))`.
/// The clamp absorbs byte-accounting overshoot on the last, partial chunk.
/// An empty file counts as complete.
pub fn progress_percent(sequence: u64, chunk_size: usize, acked: u64, file_size: u64) -> u8 {
    if file_size == 0 {
        return 100;
    }
    let done = u128::from(sequence) * chunk_size as u128 + u128::from(acked);
    let percent = done * 100 / u128::from(file_size);
    percent.min(100) as u8
}

/// Keeps a file's reported percentage monotonically non-decreasing.
///
/// Shared between the chunk progress callbacks of one file, which may run
/// on whatever thread polls the request body.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: AtomicU8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `percent`; returns it only if it advanced past every
    /// previously recorded value.
    pub fn advance(&self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        (percent > previous).then_some(percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_exactly_100_on_last_chunk() {
        let size = 2_500_000;
        let chunk = 1_000_000;
        assert_eq!(progress_percent(0, chunk, 1_000_000, size), 40);
        assert_eq!(progress_percent(1, chunk, 1_000_000, size), 80);
        assert_eq!(progress_percent(2, chunk, 500_000, size), 100);
    }

    #[test]
    fn floors_partial_percentages() {
        assert_eq!(progress_percent(0, 1_000, 999, 100_000), 0);
        assert_eq!(progress_percent(0, 1_000, 1_000, 100_000), 1);
        assert_eq!(progress_percent(0, 1_000, 1_999, 100_000), 1);
    }

    #[test]
    fn clamps_overshoot() {
        // Acked bytes larger than the remaining payload (e.g. framing overhead).
        assert_eq!(progress_percent(2, 1_000_000, 900_000, 2_500_000), 100);
    }

    #[test]
    fn empty_file_is_complete() {
        assert_eq!(progress_percent(0, 1_000, 0, 0), 100);
    }

    #[test]
    fn tracker_only_reports_increases() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.advance(10), Some(10));
        assert_eq!(tracker.advance(10), None);
        assert_eq!(tracker.advance(5), None);
        assert_eq!(tracker.advance(55), Some(55));
        assert_eq!(tracker.advance(200), Some(100));
        assert_eq!(tracker.advance(100), None);
    }

    #[test]
    fn tracker_zero_is_not_an_increase() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.advance(0), None);
    }

    #[test]
    fn tracker_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let tracker = Arc::new(ProgressTracker::new());
        let mut handles = vec![];
        for t in 0..4u8 {
            let tr = Arc::clone(&tracker);
            handles.push(thread::spawn(move || {
                for p in 0..=25u8 {
                    let _ = tr.advance(t * 25 + p);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.advance(100), None);
    }
}
