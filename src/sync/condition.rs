// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Condition Variable
//!
//! Mesa-style: a woken thread re-acquires the lock and must re-check its
//! predicate, so waits are always written as loops.
//!
//! ```ignore
//! let mut state = lock.acquire();
//! while !predicate(&state) {
//!     state = cond.sleep(state);
//! }
//! cond.wake(&state);
//! ```

use super::lock::LockGuard;
use super::wait_queue::WaitQueue;
use crate::interrupt::{InterruptCell, InterruptGuard};
use crate::sched::KThread;
use crate::traits::InterruptController;

/// Condition variable used together with a [`Lock`](super::Lock)
#[derive(Default)]
pub struct Condition {
    waiters: InterruptCell<WaitQueue>,
}

impl Condition {
    /// Create a condition with no waiters
    pub const fn new() -> Self {
        Self {
            waiters: InterruptCell::new(WaitQueue::new()),
        }
    }

    /// Release the lock, sleep until woken, then re-acquire the lock
    ///
    /// Releasing and going to sleep happen with interrupts disabled, so a
    /// wake issued after the release cannot be lost.
    ///
    /// # Panics
    ///
    /// When called from interrupt context.
    pub fn sleep<'a, T: ?Sized>(&self, guard: LockGuard<'a, T>) -> LockGuard<'a, T> {
        let current = KThread::current();
        let machine = current.machine();
        assert!(
            machine.interrupt().enabled(),
            "condition sleep in interrupt context"
        );

        let lock = guard.lock();
        let irq = InterruptGuard::new(machine.interrupt());
        self.waiters.borrow(&irq).enqueue(current);
        drop(guard);
        KThread::sleep();

        let guard = lock.acquire();
        drop(irq);
        guard
    }

    /// Wake the longest waiter, if any
    ///
    /// # Returns
    ///
    /// Whether a thread was woken
    pub fn wake<T: ?Sized>(&self, guard: &LockGuard<'_, T>) -> bool {
        self.wake_n(guard, false) > 0
    }

    /// Wake every waiter
    ///
    /// # Returns
    ///
    /// Number of threads woken
    pub fn wake_all<T: ?Sized>(&self, guard: &LockGuard<'_, T>) -> usize {
        self.wake_n(guard, true)
    }

    /// Number of sleeping threads
    pub fn waiters(&self) -> usize {
        let Some(current) = KThread::try_current() else {
            return 0;
        };
        let machine = current.machine();
        let irq = InterruptGuard::new(machine.interrupt());
        let count = self.waiters.borrow(&irq).len();
        count
    }

    fn wake_n<T: ?Sized>(&self, guard: &LockGuard<'_, T>, all: bool) -> usize {
        debug_assert!(
            guard.lock().is_held_by_current_thread(),
            "condition woken without holding its lock"
        );

        let machine = KThread::current().machine();
        let irq = InterruptGuard::new(machine.interrupt());
        let woken = {
            let mut waiters = self.waiters.borrow(&irq);
            if all {
                waiters.wake_all(&irq)
            } else {
                usize::from(waiters.wake_one(&irq).is_some())
            }
        };
        woken
    }
}
