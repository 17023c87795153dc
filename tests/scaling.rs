//! Concurrency and scaling tests.
//!
//! Exercises the channel under many threads:
//! - Concurrent publishers (offset assignment)
//! - Subscribers joining mid-stream (catch-up atomicity)
//! - Concurrent replays alongside appends
//! - Large fan-out

use replay_bus::{Channel, ChannelConfig, Delivery, DeliveryKind};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

const PUBLISHERS: usize = 8;
const PER_PUBLISHER: usize = 2_000;
const MESSAGE_COUNT: usize = PUBLISHERS * PER_PUBLISHER;

/// Timing helper
struct Timer {
    start: Instant,
    name: &'static str,
}

impl Timer {
    fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    fn report_with_count(&self, count: usize) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        println!(
            "  {} took {:.2}ms ({} items, {:.0} items/sec)",
            self.name,
            ms,
            count,
            if ms > 0.0 { count as f64 / (ms / 1000.0) } else { 0.0 }
        );
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn offsets(deliveries: &[Delivery]) -> Vec<u64> {
    deliveries.iter().map(|d| d.message.offset.0).collect()
}

// =============================================================================
// Test: concurrent publishers get unique, gap-free offsets
// =============================================================================

#[test]
fn test_concurrent_publishers_offsets_gap_free() {
    init_tracing();
    let channel = Channel::new(ChannelConfig {
        name: "concurrent".to_string(),
        initial_capacity: MESSAGE_COUNT,
        ..Default::default()
    });
    let (_subscriber, inbox) = channel.subscribe_inbox().unwrap();
    let barrier = Arc::new(Barrier::new(PUBLISHERS));

    let timer = Timer::new("Concurrent publish");
    let handles: Vec<_> = (0..PUBLISHERS)
        .map(|p| {
            let publisher = channel.publisher();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_PUBLISHER)
                    .map(|i| {
                        publisher
                            .publish(format!("p{}-{}", p, i))
                            .unwrap()
                            .offset
                            .0
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = Vec::with_capacity(MESSAGE_COUNT);
    for handle in handles {
        let mine = handle.join().unwrap();
        // Each publisher's own appends are ordered
        assert!(mine.windows(2).all(|w| w[0] < w[1]));
        all.extend(mine);
    }
    timer.report_with_count(MESSAGE_COUNT);

    all.sort_unstable();
    let expected: Vec<u64> = (0..MESSAGE_COUNT as u64).collect();
    assert_eq!(all, expected);

    // Fan-out order equals offset order
    let live = inbox.drain();
    assert_eq!(offsets(&live), expected);
    assert!(live.iter().all(|d| d.kind == DeliveryKind::Live));
}

// =============================================================================
// Test: subscribers joining mid-stream see every offset exactly once
// =============================================================================

#[test]
fn test_join_during_appends_has_no_gaps() {
    let channel = Channel::named("joiners");
    let stop_at = 5_000u64;

    let writer = {
        let publisher = channel.publisher();
        thread::spawn(move || {
            for i in 0..stop_at {
                publisher.publish(i.to_string()).unwrap();
            }
        })
    };

    let mut inboxes = Vec::new();
    for _ in 0..20 {
        let (subscriber, inbox) = channel.subscribe_inbox().unwrap();
        inboxes.push((subscriber, inbox));
        thread::yield_now();
    }
    writer.join().unwrap();

    for (_subscriber, inbox) in &inboxes {
        let seen = offsets(&inbox.drain());
        let expected: Vec<u64> = (0..stop_at).collect();
        assert_eq!(seen, expected);
    }
}

// =============================================================================
// Test: replays running alongside appends stay independent
// =============================================================================

#[test]
fn test_concurrent_replays() {
    let channel = Channel::named("replays");
    for i in 0..1_000 {
        channel.append(format!("M{}", i)).unwrap();
    }

    let writer = {
        let publisher = channel.publisher();
        thread::spawn(move || {
            for i in 1_000..2_000 {
                publisher.publish(format!("M{}", i)).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4i64)
        .map(|r| {
            let channel = channel.clone();
            thread::spawn(move || {
                let (subscriber, inbox) = channel.subscribe_inbox().unwrap();
                inbox.drain();

                let from = r * 250;
                let replayed = subscriber.start_replay(from).unwrap();
                let deliveries = inbox.drain();
                subscriber.stop_replay();

                // Live deliveries may land before start_replay; the replay
                // itself is a contiguous slice starting at `from`.
                let replay: Vec<u64> = deliveries
                    .iter()
                    .filter(|d| d.kind == DeliveryKind::Replay)
                    .map(|d| d.message.offset.0)
                    .collect();
                assert_eq!(replay.len(), replayed);
                let expected: Vec<u64> = (from as u64..from as u64 + replayed as u64).collect();
                assert_eq!(replay, expected);
                assert!(replayed >= 1_000 - from as usize);
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(channel.len(), 2_000);
}

// =============================================================================
// Test: wide fan-out
// =============================================================================

#[test]
fn test_fan_out_many_subscribers() {
    let channel = Channel::named("wide");
    let inboxes: Vec<_> = (0..200)
        .map(|_| channel.subscribe_inbox().unwrap())
        .collect();

    let timer = Timer::new("Fan out 1000 messages to 200 subscribers");
    for i in 0..1_000 {
        channel.append(format!("M{}", i)).unwrap();
    }
    timer.report_with_count(200 * 1_000);

    for (_subscriber, inbox) in &inboxes {
        assert_eq!(inbox.len(), 1_000);
    }

    let stats = channel.stats();
    assert_eq!(stats.subscriber_count, 200);
    assert_eq!(stats.message_count, 1_000);
}
