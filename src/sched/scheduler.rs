// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler implementation
//!
//! FIFO ready queue plus the dispatch loop. When nothing is ready the
//! machine idles forward to the next interrupt; when idling cannot wake
//! anyone the machine is deadlocked and halts.

use super::state::{RunQueue, ThreadState};
use super::thread::KThread;
use crate::error::MachineError;
use crate::interrupt::{InterruptCell, InterruptGuard};
use crate::machine::Machine;
use crate::traits::InterruptController;

/// Scheduler
///
/// Owns the ready queue. Only touched with interrupts disabled.
pub struct Scheduler {
    ready: InterruptCell<RunQueue>,
}

impl Scheduler {
    /// Create a new scheduler
    pub const fn new() -> Self {
        Self {
            ready: InterruptCell::new(RunQueue::new()),
        }
    }

    /// Append `thread` to the ready queue
    ///
    /// # Panics
    ///
    /// When the thread is already ready or has finished: each wake-up
    /// must ready a thread exactly once.
    pub fn ready(&self, thread: KThread, irq: &InterruptGuard<'_>) {
        let state = thread.state();
        assert!(
            state != ThreadState::Ready && state != ThreadState::Finished,
            "cannot ready {} in state {:?}",
            thread,
            state
        );

        let machine = thread.machine();
        ktrace!(machine.config().trace, SCHED, "{} ready", thread);

        thread.set_state(ThreadState::Ready);
        self.ready.borrow(irq).enqueue(thread);
    }

    /// Take the head of the ready queue
    pub fn dequeue(&self, irq: &InterruptGuard<'_>) -> Option<KThread> {
        self.ready.borrow(irq).dequeue()
    }

    /// Pick the next thread to run, idling until one is ready
    ///
    /// Called with interrupts disabled by a thread giving up the CPU.
    ///
    /// # Returns
    ///
    /// `None` once the machine has halted, either before the call or
    /// because no thread can ever become ready again.
    pub(crate) fn next_thread(&self, machine: &Machine) -> Option<KThread> {
        let interrupt = machine.interrupt();
        debug_assert!(!interrupt.enabled(), "dispatch with interrupts enabled");

        loop {
            {
                let irq = InterruptGuard::new(interrupt);
                if let Some(next) = self.dequeue(&irq) {
                    return Some(next);
                }
            }

            if machine.is_halted() {
                return None;
            }

            // The timer is periodic, so an interrupt is always pending;
            // idling only helps if the handler has someone to wake.
            if !machine.timer().has_pending_work() || !interrupt.idle() {
                let blocked = machine.live_threads();
                ktrace!(
                    machine.config().trace,
                    SCHED,
                    "deadlock at tick {}: {} threads blocked",
                    interrupt.now(),
                    blocked
                );
                machine.halt(Err(MachineError::Deadlock { blocked }));
                return None;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
