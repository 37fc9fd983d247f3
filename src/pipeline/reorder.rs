//! Bounded reordering buffer: accepts items tagged with a dense sequence number in any order and
//! releases them strictly in sequence order (1, 2, 3, …).
//!
//! Admission rule: the item for `next_sequence` is always accepted, even over capacity, so the
//! consumer can never be wedged by a buffer full of later items. Any other item is accepted only
//! while fewer than `capacity - 1` out-of-order items are resident.
//!
//! One mutex guards the map and all counters, so advancing `next_sequence` and `items_returned`
//! is a single step for any number of consumers. A condition variable wakes takers on insert and
//! `set_total`, and wakes blocked inserters on take.

use log::trace;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::utils::config::PipelineDefaults;

/// Result of a timed take.
#[derive(Debug, PartialEq, Eq)]
pub enum TakeOutcome<T> {
    /// The next item in sequence order.
    Item(T),
    /// Total is known and every item has been released.
    EndOfStream,
    /// Timed out waiting for the next item.
    Pending,
}

struct ReorderState<T> {
    pending: HashMap<u64, T>,
    next_sequence: u64,
    items_returned: u64,
    total_items: Option<u64>,
}

impl<T> ReorderState<T> {
    /// Resident items other than the one for `next_sequence`.
    fn out_of_order(&self) -> usize {
        self.pending.len() - usize::from(self.pending.contains_key(&self.next_sequence))
    }

    fn admits(&self, sequence: u64, capacity: usize) -> bool {
        sequence == self.next_sequence || self.out_of_order() < capacity - 1
    }

    fn is_exhausted(&self) -> bool {
        matches!(self.total_items, Some(total) if self.items_returned >= total)
    }

    fn pop_next(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next_sequence)?;
        self.next_sequence += 1;
        self.items_returned += 1;
        Some(item)
    }
}

pub struct ReorderBuffer<T> {
    capacity: usize,
    state: Mutex<ReorderState<T>>,
    cv: Condvar,
}

impl<T> ReorderBuffer<T> {
    /// `capacity` below 2 leaves no room for out-of-order items and is raised to 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            state: Mutex::new(ReorderState {
                pending: HashMap::with_capacity(capacity),
                next_sequence: 1,
                items_returned: 0,
                total_items: None,
            }),
            cv: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReorderState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert without waiting. On rejection the item is handed back so the caller can retry.
    ///
    /// Inserting a sequence that is already resident replaces it; callers insert each sequence once.
    pub fn try_insert(&self, sequence: u64, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if !state.admits(sequence, self.capacity) {
            trace!(
                "reject seq {} (next {}, out of order {})",
                sequence,
                state.next_sequence,
                state.out_of_order()
            );
            return Err(item);
        }
        state.pending.insert(sequence, item);
        drop(state);
        self.cv.notify_all();
        Ok(())
    }

    /// Insert, waiting up to `timeout` for room. Hands the item back if there is still no room.
    pub fn insert_timeout(&self, sequence: u64, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.admits(sequence, self.capacity) {
                state.pending.insert(sequence, item);
                drop(state);
                self.cv.notify_all();
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(item);
            }
            let (guard, _) = self
                .cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Record how many items the stream holds in total. May be called after items were released.
    pub fn set_total(&self, total: u64) {
        log::debug!("reorder buffer: total items = {}", total);
        self.lock().total_items = Some(total);
        self.cv.notify_all();
    }

    /// Take the next item in order, waiting up to `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> TakeOutcome<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(item) = state.pop_next() {
                trace!(
                    "took seq {}; returned {} of {:?}",
                    state.next_sequence - 1,
                    state.items_returned,
                    state.total_items
                );
                drop(state);
                self.cv.notify_all();
                return TakeOutcome::Item(item);
            }
            if state.is_exhausted() {
                return TakeOutcome::EndOfStream;
            }
            let now = Instant::now();
            if now >= deadline {
                return TakeOutcome::Pending;
            }
            let (guard, _) = self
                .cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Block until the next item is available (`Some`) or the stream has ended (`None`).
    /// Never returns `None` before [`set_total`](Self::set_total) has been called.
    pub fn take(&self) -> Option<T> {
        loop {
            match self.take_timeout(PipelineDefaults::POLL_INTERVAL) {
                TakeOutcome::Item(item) => return Some(item),
                TakeOutcome::EndOfStream => return None,
                TakeOutcome::Pending => continue,
            }
        }
    }

    /// Items currently resident (in-order and out-of-order).
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn out_of_order_len(&self) -> usize {
        self.lock().out_of_order()
    }

    pub fn next_sequence(&self) -> u64 {
        self.lock().next_sequence
    }

    pub fn items_returned(&self) -> u64 {
        self.lock().items_returned
    }

    pub fn total_items(&self) -> Option<u64> {
        self.lock().total_items
    }

    /// True once the total is known and every item has been released.
    pub fn is_finished(&self) -> bool {
        self.lock().is_exhausted()
    }

    /// True when the stream is not finished and the next item is not resident, i.e. the
    /// consumer is waiting on someone to insert `next_sequence`.
    pub fn is_waiting_for_next(&self) -> bool {
        let state = self.lock();
        !state.is_exhausted() && !state.pending.contains_key(&state.next_sequence)
    }
}
