use std::sync::Arc;
use std::thread;

use detector_core::sampling::{OccupancyWindow, SenseCounter, WINDOW_BINS};

/// After every tick, the windowed sum equals the edge total over the most
/// recent N completed cycles — not more, not fewer.
#[test]
fn windowed_sum_conserves_recent_edge_counts() {
    let counter = SenseCounter::new();
    let mut window = OccupancyWindow::new();
    let edges_per_cycle: [u16; 25] = [
        0, 1, 4, 0, 2, 2, 7, 0, 0, 1, 3, 3, 0, 5, 0, 0, 2, 6, 1, 0, 4, 0, 0, 2, 1,
    ];

    let mut completed: Vec<u16> = Vec::new();
    for &edges in &edges_per_cycle {
        for _ in 0..edges {
            counter.record_edge();
        }
        let drained = counter.drain();
        assert_eq!(drained, edges);
        completed.push(drained);

        let recent = completed.iter().rev().take(WINDOW_BINS);
        let expected: u32 = recent.copied().map(u32::from).sum();
        assert_eq!(window.tick(drained), expected);
    }
}

/// Edges recorded between drains land in the following cycle, never the
/// previous one.
#[test]
fn late_edges_belong_to_the_next_cycle() {
    let counter = SenseCounter::new();
    counter.record_edge();
    assert_eq!(counter.drain(), 1);
    counter.record_edge();
    counter.record_edge();
    assert_eq!(counter.drain(), 2);
    assert_eq!(counter.drain(), 0);
}

/// Hammering the counter from another thread while draining loses nothing
/// and double-counts nothing: every edge shows up in exactly one drain.
#[test]
fn concurrent_edges_are_counted_exactly_once() {
    // Stays comfortably below the counter's saturation point even if every
    // edge lands before the first drain.
    const EDGES: u32 = 20_000;

    let counter = Arc::new(SenseCounter::new());
    let producer = {
        let counter = Arc::clone(&counter);
        thread::spawn(move || {
            for _ in 0..EDGES {
                counter.record_edge();
            }
        })
    };

    let mut drained_total: u32 = 0;
    while !producer.is_finished() {
        drained_total += u32::from(counter.drain());
    }
    producer.join().expect("producer thread");
    drained_total += u32::from(counter.drain());

    assert_eq!(drained_total, EDGES);
}
