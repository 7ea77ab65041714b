// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Sleeping Lock
//!
//! Mutual exclusion between kernel threads. A thread that finds the lock
//! held joins the lock's wait queue and sleeps instead of spinning.
//! Release hands the lock directly to the longest waiter, so a woken
//! thread owns the lock the moment it runs.
//!
//! The lock bookkeeping is protected by disabling interrupts; the guarded
//! data is protected by the lock itself.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use super::wait_queue::WaitQueue;
use crate::interrupt::{InterruptCell, InterruptGuard};
use crate::sched::{KThread, ThreadId};

/// Holder and waiters
struct LockState {
    holder: Option<ThreadId>,
    waiters: WaitQueue,
}

/// A sleeping mutual exclusion lock
pub struct Lock<T: ?Sized> {
    state: InterruptCell<LockState>,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for Lock<T> {}
unsafe impl<T: ?Sized + Send> Sync for Lock<T> {}

impl<T> Lock<T> {
    /// Create a new unlocked lock
    pub const fn new(data: T) -> Self {
        Self {
            state: InterruptCell::new(LockState {
                holder: None,
                waiters: WaitQueue::new(),
            }),
            data: UnsafeCell::new(data),
        }
    }

    /// Consume the lock
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Lock<T> {
    /// Acquire the lock, sleeping until it becomes available
    ///
    /// # Panics
    ///
    /// When the calling thread already holds the lock.
    pub fn acquire(&self) -> LockGuard<'_, T> {
        let current = KThread::current();
        let machine = current.machine();
        let irq = InterruptGuard::new(machine.interrupt());

        let must_wait = {
            let mut state = self.state.borrow(&irq);
            assert!(
                state.holder != Some(current.id()),
                "lock acquired twice by {}",
                current
            );
            if state.holder.is_none() {
                state.holder = Some(current.id());
                false
            } else {
                state.waiters.enqueue(current.clone());
                true
            }
        };

        if must_wait {
            // Ownership is handed over by the releasing thread
            KThread::sleep();
            debug_assert_eq!(self.state.borrow(&irq).holder, Some(current.id()));
        }

        LockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Whether the calling thread holds the lock
    pub fn is_held_by_current_thread(&self) -> bool {
        let Some(current) = KThread::try_current() else {
            return false;
        };
        let machine = current.machine();
        let irq = InterruptGuard::new(machine.interrupt());
        let held = self.state.borrow(&irq).holder == Some(current.id());
        held
    }

    /// Number of threads waiting for the lock
    pub fn waiters(&self) -> usize {
        let Some(current) = KThread::try_current() else {
            return 0;
        };
        let machine = current.machine();
        let irq = InterruptGuard::new(machine.interrupt());
        let count = self.state.borrow(&irq).waiters.len();
        count
    }

    fn release(&self) {
        let current = KThread::current();
        let machine = current.machine();
        let irq = InterruptGuard::new(machine.interrupt());

        let mut state = self.state.borrow(&irq);
        assert!(
            state.holder == Some(current.id()),
            "lock released by {} which does not hold it",
            current
        );
        match state.waiters.pop() {
            Some(next) => {
                state.holder = Some(next.id());
                machine.scheduler().ready(next, &irq);
            }
            None => state.holder = None,
        }
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard for a [`Lock`]
///
/// Not `Send`: the lock belongs to the thread that acquired it.
pub struct LockGuard<'a, T: ?Sized> {
    lock: &'a Lock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T: ?Sized> LockGuard<'a, T> {
    /// Lock this guard belongs to
    pub(crate) fn lock(&self) -> &'a Lock<T> {
        self.lock
    }
}

impl<T: ?Sized> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl<T: ?Sized> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

unsafe impl<T: ?Sized + Sync> Sync for LockGuard<'_, T> {}
