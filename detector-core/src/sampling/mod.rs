//! Sense-event accumulation and the rolling occupancy window.
//!
//! Two interrupt sources feed this module: the sense-edge interrupt bumps the
//! [`SenseCounter`] whenever the input transitions low-to-high, and the
//! periodic sampling timer drains the counter into the [`OccupancyWindow`]
//! once per cycle. The drain is a single atomic swap, so an edge that lands
//! mid-drain is attributed to exactly one of the two adjacent cycles.

use heapless::HistoryBuf;
use portable_atomic::{AtomicU16, Ordering};

/// Number of per-cycle bins in the occupancy window.
pub const WINDOW_BINS: usize = 10;
/// Sense pulses expected per cycle from an unobstructed sensor.
pub const SAMPLES_PER_CYCLE: u32 = 2;
/// Sampling cycle rate the calibrated timer is programmed for (Hz).
pub const TARGET_CYCLE_HZ: u32 = 30;

/// Edge counter shared between the sense interrupt and the sampling tick.
///
/// Lives in a `static` and is touched from two interrupt contexts, so both
/// operations go through one atomic cell. The counter saturates instead of
/// wrapping; a saturated value already means the window statistic is pinned
/// far above any threshold.
#[derive(Debug, Default)]
pub struct SenseCounter {
    edges: AtomicU16,
}

impl SenseCounter {
    /// Creates a counter holding zero edges.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            edges: AtomicU16::new(0),
        }
    }

    /// Records one low-to-high sense transition.
    pub fn record_edge(&self) {
        let _ = self
            .edges
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |edges| {
                edges.checked_add(1)
            });
    }

    /// Returns the edges accumulated since the previous drain and resets to
    /// zero in the same atomic step.
    pub fn drain(&self) -> u16 {
        self.edges.swap(0, Ordering::Relaxed)
    }

    /// Current count without draining, for diagnostics only.
    #[must_use]
    pub fn peek(&self) -> u16 {
        self.edges.load(Ordering::Relaxed)
    }
}

/// Fixed-size histogram of per-cycle edge counts.
///
/// Each tick retires the oldest bin, stores the newest count, and recomputes
/// the windowed sum. At ten bins the O(N) recompute is cheaper than any
/// amortized structure would be.
pub struct OccupancyWindow {
    bins: HistoryBuf<u16, WINDOW_BINS>,
}

impl OccupancyWindow {
    /// Creates a zero-filled window, as if the last N cycles saw no edges.
    #[must_use]
    pub fn new() -> Self {
        let mut bins = HistoryBuf::new();
        for _ in 0..WINDOW_BINS {
            bins.write(0);
        }
        Self { bins }
    }

    /// Folds one completed cycle into the window and returns the new sum.
    pub fn tick(&mut self, cycle_count: u16) -> u32 {
        self.bins.write(cycle_count);
        self.windowed_sum()
    }

    /// Total edge count across the last [`WINDOW_BINS`] completed cycles.
    #[must_use]
    pub fn windowed_sum(&self) -> u32 {
        self.bins.oldest_ordered().copied().map(u32::from).sum()
    }
}

impl Default for OccupancyWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_drains_to_zero() {
        let counter = SenseCounter::new();
        counter.record_edge();
        counter.record_edge();
        counter.record_edge();
        assert_eq!(counter.drain(), 3);
        assert_eq!(counter.drain(), 0);
    }

    #[test]
    fn counter_saturates_at_max() {
        let counter = SenseCounter::new();
        counter.edges.store(u16::MAX, Ordering::Relaxed);
        counter.record_edge();
        assert_eq!(counter.peek(), u16::MAX);
    }

    #[test]
    fn fresh_window_sums_to_zero() {
        let window = OccupancyWindow::new();
        assert_eq!(window.windowed_sum(), 0);
    }

    #[test]
    fn window_retires_the_oldest_bin() {
        let mut window = OccupancyWindow::new();
        for cycle in 0..WINDOW_BINS {
            assert_eq!(window.tick(2), 2 * (u32::try_from(cycle).unwrap() + 1));
        }
        // Window is full of twos; a quiet cycle displaces one of them.
        assert_eq!(window.tick(0), 18);
        // Nine more quiet cycles flush the remaining twos.
        for _ in 0..WINDOW_BINS - 1 {
            window.tick(0);
        }
        assert_eq!(window.windowed_sum(), 0);
    }

    #[test]
    fn window_sum_tracks_the_last_n_cycles_exactly() {
        let mut window = OccupancyWindow::new();
        let counts: [u16; 14] = [5, 0, 3, 7, 1, 0, 0, 9, 2, 4, 6, 0, 8, 1];
        let mut sums = [0u32; 14];
        for (i, &count) in counts.iter().enumerate() {
            sums[i] = window.tick(count);
        }
        // After the 14th tick only counts[4..14] remain in the window.
        let expected: u32 = counts[4..].iter().copied().map(u32::from).sum();
        assert_eq!(sums[13], expected);
    }
}
