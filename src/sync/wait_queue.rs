// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Wait Queue
//!
//! Threads blocked on a synchronization primitive, in arrival order.
//!
//! # Design
//!
//! - **FIFO**: the longest waiter is woken first
//! - **Passive**: the queue never blocks by itself; the owner enqueues the
//!   current thread, releases its borrow, then calls [`KThread::sleep`]
//! - **Interrupt-protected**: owners keep it in an
//!   [`InterruptCell`](crate::interrupt::InterruptCell), and waking takes
//!   the interrupt guard as proof
//!
//! # Usage
//!
//! ```ignore
//! let irq = InterruptGuard::new(machine.interrupt());
//! cell.borrow(&irq).enqueue(KThread::current());
//! KThread::sleep();
//!
//! // elsewhere
//! cell.borrow(&irq).wake_one(&irq);
//! ```

use std::collections::VecDeque;

use crate::interrupt::InterruptGuard;
use crate::sched::{KThread, ThreadId};

/// ============================================================================
/// Wait Queue
/// ============================================================================

/// FIFO queue of blocked threads
#[derive(Default)]
pub struct WaitQueue {
    waiters: VecDeque<KThread>,
}

impl WaitQueue {
    /// Create a new wait queue
    pub const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Get the number of waiters
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether a thread is queued
    pub fn contains(&self, id: ThreadId) -> bool {
        self.waiters.iter().any(|thread| thread.id() == id)
    }

    /// Queue a thread at the tail
    pub fn enqueue(&mut self, thread: KThread) {
        debug_assert!(!self.contains(thread.id()), "{} queued twice", thread);
        self.waiters.push_back(thread);
    }

    /// Remove the longest waiter without waking it
    pub fn pop(&mut self) -> Option<KThread> {
        self.waiters.pop_front()
    }

    /// Wake the longest waiter
    ///
    /// # Returns
    ///
    /// - Some(thread) if a waiter was woken
    /// - None if queue was empty
    pub fn wake_one(&mut self, irq: &InterruptGuard<'_>) -> Option<KThread> {
        let thread = self.pop()?;
        thread.machine().scheduler().ready(thread.clone(), irq);
        Some(thread)
    }

    /// Wake all waiters
    ///
    /// # Returns
    ///
    /// Number of waiters woken
    pub fn wake_all(&mut self, irq: &InterruptGuard<'_>) -> usize {
        let mut count = 0;
        while self.wake_one(irq).is_some() {
            count += 1;
        }
        count
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::MachineConfig;
    use crate::machine::Machine;

    #[test]
    fn test_wait_queue_pop_order() {
        let machine = Machine::new(MachineConfig::default()).unwrap();
        let (a, b) = (KThread::create(&machine, "a"), KThread::create(&machine, "b"));

        let mut wq = WaitQueue::new();
        assert!(wq.pop().is_none());

        wq.enqueue(a.clone());
        wq.enqueue(b.clone());
        assert_eq!(wq.len(), 2);
        assert!(wq.contains(a.id()));

        assert_eq!(wq.pop(), Some(a.clone()));
        assert!(!wq.contains(a.id()));
        assert_eq!(wq.pop(), Some(b));
        assert_eq!(wq.len(), 0);
    }

    #[test]
    #[should_panic(expected = "queued twice")]
    #[cfg(debug_assertions)]
    fn test_wait_queue_rejects_duplicate() {
        let machine = Machine::new(MachineConfig::default()).unwrap();
        let a = KThread::create(&machine, "a");

        let mut wq = WaitQueue::new();
        wq.enqueue(a.clone());
        wq.enqueue(a);
    }
}
