// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rendezvous
//!
//! Synchronous pairwise value exchange. The first thread to call
//! [`Rendezvous::exchange`] on a tag blocks until a second thread arrives
//! on the same tag; the two then swap values and both return.
//!
//! # Design
//!
//! Each tag has its own exchange point (lock, condition variable, and a
//! pair of parallel queues holding the waiting threads and their values).
//! Points are created on first use and kept for the lifetime of the
//! rendezvous. Different tags never share a lock, apart from the table
//! lock taken briefly to look a point up.
//!
//! An exchange runs in three phases under the point's lock:
//!
//! 1. **Pairing**: wait until the caller is in one of the first two queue
//!    slots, its partner is present, and no earlier pair is still inside.
//! 2. **Exchange**: take the partner's value, then wait until the partner
//!    has taken ours.
//! 3. **Departure**: the second thread to leave removes the pair from the
//!    head of both queues and wakes everyone queued behind it.
//!
//! A third thread arriving mid-exchange stays queued until the pair has
//! left, then pairs with the next arrival.
//!
//! # Usage
//!
//! ```ignore
//! let rendezvous = Arc::new(Rendezvous::new());
//! // thread A
//! let got = rendezvous.exchange(0, -1); // got == 1
//! // thread B
//! let got = rendezvous.exchange(0, 1);  // got == -1
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::condition::Condition;
use super::lock::Lock;
use crate::sched::{KThread, ThreadId};

/// Synchronization point selector
pub type Tag = i32;

/// Threads per exchange
const PAIR: usize = 2;

/// ============================================================================
/// Exchange Point
/// ============================================================================

/// Per-tag bookkeeping, guarded by the point's lock
struct Exchange<V> {
    /// Waiting threads in arrival order
    threads: VecDeque<ThreadId>,

    /// Offered values, same positions as `threads`; taken by the partner
    values: VecDeque<Option<V>>,

    /// Members of the head pair that have taken their partner's value
    exchanged: usize,

    /// Members of the head pair on their way out
    departed: usize,
}

impl<V> Exchange<V> {
    fn new() -> Self {
        Self {
            threads: VecDeque::new(),
            values: VecDeque::new(),
            exchanged: 0,
            departed: 0,
        }
    }

    /// Queue position of `id`
    fn slot(&self, id: ThreadId) -> Option<usize> {
        self.threads.iter().position(|&queued| queued == id)
    }

    /// Whether `id` may start exchanging
    fn can_pair(&self, id: ThreadId) -> bool {
        self.threads.len() >= PAIR
            && self.exchanged < PAIR
            && self.slot(id).map_or(false, |slot| slot < PAIR)
    }

    /// Drop the head pair and reset the pair counters
    fn retire_pair(&mut self) {
        self.threads.drain(..PAIR);
        self.values.drain(..PAIR);
        self.exchanged = 0;
        self.departed = 0;
    }
}

struct Point<V> {
    state: Lock<Exchange<V>>,
    cond: Condition,
}

impl<V> Point<V> {
    fn new() -> Self {
        Self {
            state: Lock::new(Exchange::new()),
            cond: Condition::new(),
        }
    }
}

/// ============================================================================
/// Rendezvous
/// ============================================================================

/// Pairwise exchange of values over independent tags
pub struct Rendezvous<V = i32> {
    points: Lock<HashMap<Tag, Arc<Point<V>>>>,
}

impl<V: Send> Rendezvous<V> {
    /// Create a rendezvous with no tags
    pub fn new() -> Self {
        Self {
            points: Lock::new(HashMap::new()),
        }
    }

    /// Exchange `value` with another thread on `tag`
    ///
    /// Blocks until a partner arrives; returns the partner's value. A
    /// caller that never gets a partner blocks forever.
    pub fn exchange(&self, tag: Tag, value: V) -> V {
        let current = KThread::current();
        let me = current.id();
        let trace = current.machine().config().trace;
        let point = self.point(tag);

        let mut state = point.state.acquire();
        state.threads.push_back(me);
        state.values.push_back(Some(value));
        debug_assert_eq!(state.threads.len(), state.values.len());
        ktrace!(
            trace,
            RENDEZVOUS,
            "{} joins tag {} ({} queued)",
            current,
            tag,
            state.threads.len()
        );

        while !state.can_pair(me) {
            state = point.cond.sleep(state);
        }
        point.cond.wake(&state);

        let slot = state.slot(me).expect("paired thread lost its slot");
        let received = state.values[slot ^ 1].take().expect("partner value taken twice");
        state.exchanged += 1;
        ktrace!(trace, RENDEZVOUS, "{} exchanged on tag {} from slot {}", current, tag, slot);
        if state.exchanged == PAIR {
            // A queued third thread may hold the single wake; the partner must see it too
            point.cond.wake_all(&state);
        }

        while state.exchanged < PAIR {
            state = point.cond.sleep(state);
        }
        point.cond.wake(&state);

        state.departed += 1;
        if state.departed == PAIR {
            state.retire_pair();
            ktrace!(
                trace,
                RENDEZVOUS,
                "pair on tag {} departed, {} still queued",
                tag,
                state.threads.len()
            );
            // Every queued thread may now sit in a pairing slot
            point.cond.wake_all(&state);
        }

        received
    }

    /// Number of threads queued on `tag`
    ///
    /// # Panics
    ///
    /// When called from a host thread that is not a kernel thread.
    pub fn waiting(&self, tag: Tag) -> usize {
        let point = {
            let points = self.points.acquire();
            points.get(&tag).cloned()
        };
        match point {
            Some(point) => {
                let state = point.state.acquire();
                state.threads.len()
            }
            None => 0,
        }
    }

    /// Number of tags seen so far
    ///
    /// # Panics
    ///
    /// When called from a host thread that is not a kernel thread.
    pub fn tags(&self) -> usize {
        let points = self.points.acquire();
        points.len()
    }

    /// Exchange point for `tag`, created on first use
    fn point(&self, tag: Tag) -> Arc<Point<V>> {
        let mut points = self.points.acquire();
        let point = points.entry(tag).or_insert_with(|| Arc::new(Point::new()));
        Arc::clone(point)
    }
}

impl<V: Send> Default for Rendezvous<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(threads: &[ThreadId]) -> Exchange<i32> {
        let mut exchange = Exchange::new();
        for (value, &id) in threads.iter().enumerate() {
            exchange.threads.push_back(id);
            exchange.values.push_back(Some(value as i32));
        }
        exchange
    }

    #[test]
    fn test_lone_thread_cannot_pair() {
        let exchange = queued(&[10]);
        assert!(!exchange.can_pair(10));
    }

    #[test]
    fn test_head_pair_can_pair() {
        let exchange = queued(&[10, 11, 12]);
        assert!(exchange.can_pair(10));
        assert!(exchange.can_pair(11));
        assert!(!exchange.can_pair(12));
        assert!(!exchange.can_pair(99));
    }

    #[test]
    fn test_no_pairing_until_pair_departs() {
        let mut exchange = queued(&[10, 11, 12, 13]);
        exchange.exchanged = PAIR;
        assert!(!exchange.can_pair(10));

        exchange.retire_pair();
        assert_eq!(exchange.threads, VecDeque::from([12, 13]));
        assert_eq!(exchange.values.len(), 2);
        assert_eq!(exchange.exchanged, 0);
        assert!(exchange.can_pair(12));
        assert!(exchange.can_pair(13));
    }

    #[test]
    #[should_panic(expected = "not running on a kernel thread")]
    fn test_tags_outside_kernel_thread() {
        Rendezvous::<i32>::new().tags();
    }
}
