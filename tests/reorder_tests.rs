use conveyor::pipeline::{ReorderBuffer, TakeOutcome};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SHORT: Duration = Duration::from_millis(20);

fn drain(buffer: &ReorderBuffer<u64>) -> Vec<u64> {
    let mut out = Vec::new();
    while let Some(v) = buffer.take() {
        out.push(v);
    }
    out
}

// --- ordering ---

#[test]
fn test_takes_in_sequence_order_after_reverse_inserts() {
    let buffer = ReorderBuffer::new(5);
    assert!(buffer.try_insert(3, 3).is_ok());
    assert!(buffer.try_insert(1, 1).is_ok());
    assert!(buffer.try_insert(2, 2).is_ok());
    buffer.set_total(3);
    assert_eq!(buffer.take(), Some(1));
    assert_eq!(buffer.take(), Some(2));
    assert_eq!(buffer.take(), Some(3));
    assert_eq!(buffer.take(), None);
}

#[test]
fn test_random_permutation_comes_out_sorted() {
    let n = 200_u64;
    let mut seqs: Vec<u64> = (1..=n).collect();
    seqs.shuffle(&mut rand::thread_rng());
    let buffer = ReorderBuffer::new(n as usize + 1);
    for s in seqs {
        assert!(buffer.try_insert(s, s).is_ok());
    }
    buffer.set_total(n);
    assert_eq!(drain(&buffer), (1..=n).collect::<Vec<_>>());
}

#[test]
fn test_take_pending_while_next_missing() {
    let buffer = ReorderBuffer::new(4);
    assert!(buffer.try_insert(2, 2).is_ok());
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::Pending);
    assert!(buffer.is_waiting_for_next());
    assert!(buffer.try_insert(1, 1).is_ok());
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::Item(1));
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::Item(2));
}

// --- admission ---

#[test]
fn test_capacity_two_rejects_second_out_of_order() {
    let buffer = ReorderBuffer::new(2);
    assert!(buffer.try_insert(1, 1).is_ok());
    assert!(buffer.try_insert(2, 2).is_ok());
    assert_eq!(buffer.try_insert(4, 4), Err(4));
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::Item(1));
    assert!(buffer.try_insert(4, 4).is_ok());
}

#[test]
fn test_next_sequence_admitted_when_full() {
    let buffer = ReorderBuffer::new(3);
    assert!(buffer.try_insert(2, 2).is_ok());
    assert!(buffer.try_insert(3, 3).is_ok());
    assert_eq!(buffer.out_of_order_len(), 2);
    assert_eq!(buffer.try_insert(4, 4), Err(4));
    assert!(buffer.try_insert(1, 1).is_ok());
    assert_eq!(buffer.len(), 3);
}

#[test]
fn test_out_of_order_never_exceeds_capacity_minus_one() {
    let capacity = 4;
    let buffer = ReorderBuffer::new(capacity);
    for s in 2..20 {
        let _ = buffer.try_insert(s, s);
        assert!(buffer.out_of_order_len() <= capacity - 1);
    }
    assert_eq!(buffer.out_of_order_len(), capacity - 1);
}

#[test]
fn test_capacity_raised_to_two() {
    let buffer: ReorderBuffer<u64> = ReorderBuffer::new(0);
    assert_eq!(buffer.capacity(), 2);
    assert!(buffer.try_insert(2, 2).is_ok());
}

#[test]
fn test_insert_timeout_gives_item_back() {
    let buffer = ReorderBuffer::new(2);
    assert!(buffer.try_insert(2, 2).is_ok());
    assert_eq!(buffer.insert_timeout(3, 3, SHORT), Err(3));
}

#[test]
fn test_insert_timeout_succeeds_after_take() {
    let buffer = Arc::new(ReorderBuffer::new(2));
    assert!(buffer.try_insert(1, 1).is_ok());
    assert!(buffer.try_insert(2, 2).is_ok());
    let taker = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            buffer.take_timeout(Duration::from_secs(1))
        })
    };
    assert!(buffer.insert_timeout(3, 3, Duration::from_secs(5)).is_ok());
    assert_eq!(taker.join().unwrap(), TakeOutcome::Item(1));
}

// --- end of stream ---

#[test]
fn test_end_of_stream_only_after_total() {
    let buffer = ReorderBuffer::new(4);
    assert!(buffer.try_insert(1, 1).is_ok());
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::Item(1));
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::Pending);
    assert!(!buffer.is_finished());
    buffer.set_total(1);
    assert_eq!(buffer.take_timeout(SHORT), TakeOutcome::EndOfStream);
    assert!(buffer.is_finished());
    assert!(!buffer.is_waiting_for_next());
}

#[test]
fn test_zero_total_ends_immediately() {
    let buffer: ReorderBuffer<u64> = ReorderBuffer::new(4);
    buffer.set_total(0);
    assert_eq!(buffer.take(), None);
}

#[test]
fn test_total_set_late_wakes_blocked_taker() {
    let buffer: Arc<ReorderBuffer<u64>> = Arc::new(ReorderBuffer::new(4));
    let taker = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || buffer.take())
    };
    thread::sleep(Duration::from_millis(50));
    buffer.set_total(0);
    assert_eq!(taker.join().unwrap(), None);
}

#[test]
fn test_counters_track_progress() {
    let buffer = ReorderBuffer::new(4);
    assert_eq!(buffer.next_sequence(), 1);
    assert!(buffer.try_insert(1, 1).is_ok());
    assert!(buffer.try_insert(2, 2).is_ok());
    buffer.set_total(2);
    assert_eq!(buffer.total_items(), Some(2));
    let _ = buffer.take();
    assert_eq!(buffer.next_sequence(), 2);
    assert_eq!(buffer.items_returned(), 1);
    assert!(!buffer.is_empty());
}

// --- concurrency ---

#[test]
fn test_concurrent_producers_single_consumer() {
    let n = 2_000_u64;
    let producers = 8_u64;
    let buffer = Arc::new(ReorderBuffer::new(16));

    let consumer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || drain(&buffer))
    };
    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut s = p + 1;
                while s <= n {
                    let mut item = s;
                    loop {
                        match buffer.insert_timeout(s, item, Duration::from_millis(10)) {
                            Ok(()) => break,
                            Err(back) => item = back,
                        }
                    }
                    s += producers;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    buffer.set_total(n);
    let out = consumer.join().unwrap();
    assert_eq!(out, (1..=n).collect::<Vec<_>>());
    assert!(buffer.is_empty());
}
