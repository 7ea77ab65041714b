// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Alarm
//!
//! Timed sleep driven by the periodic timer. A thread calling
//! [`Alarm::wait_until`] leaves a wait record and blocks; every timer
//! interrupt preempts the running thread and then readies each thread
//! whose deadline has passed.
//!
//! # Design
//!
//! - **Interrupt-protected**: the wait list is an [`InterruptCell`], so
//!   it is only touched with interrupts disabled and the timer handler can
//!   never observe a half-inserted record
//! - **Single resolution**: a record is removed either by expiry or by
//!   [`Alarm::cancel`], never both, so a thread is readied once per wait
//! - **Unordered**: records are scanned in one pass; equal deadlines wake
//!   in no particular order
//!
//! # Usage
//!
//! ```ignore
//! let alarm = Alarm::new(&machine);
//! // on a kernel thread:
//! alarm.wait_until(1_000);
//! ```

use std::sync::{Arc, Weak};

use crate::config::TraceFlags;
use crate::interrupt::{InterruptCell, InterruptGuard};
use crate::machine::Machine;
use crate::sched::KThread;
use crate::traits::TimerInterruptHandler;

/// ============================================================================
/// Wait Record
/// ============================================================================

/// A thread sleeping until `deadline`
struct WaitRecord {
    thread: KThread,

    /// Absolute tick at which the thread may run again
    deadline: u64,
}

/// ============================================================================
/// Alarm
/// ============================================================================

/// Timed sleep service
///
/// One per machine; creating it takes over the machine timer.
pub struct Alarm {
    waiters: InterruptCell<Vec<WaitRecord>>,

    /// Weak: the machine timer holds the alarm
    machine: Weak<Machine>,

    trace: TraceFlags,
}

impl Alarm {
    /// Create an alarm and install it as the timer interrupt handler
    pub fn new(machine: &Arc<Machine>) -> Arc<Alarm> {
        let alarm = Arc::new(Alarm {
            waiters: InterruptCell::new(Vec::new()),
            machine: Arc::downgrade(machine),
            trace: machine.config().trace,
        });
        machine.timer().set_interrupt_handler(alarm.clone());
        alarm
    }

    /// Put the current thread to sleep for at least `x` ticks
    ///
    /// The thread is readied by the first timer interrupt at or after
    /// `now + x`. A zero or negative `x` still sleeps until the next
    /// timer interrupt.
    pub fn wait_until(&self, x: i64) {
        let current = KThread::current();
        let machine = current.machine();
        debug_assert!(self.is_for(&machine), "alarm used on a foreign machine");

        let irq = InterruptGuard::new(machine.interrupt());
        let now = machine.timer().get_time();
        let deadline = now.saturating_add_signed(x);

        {
            let mut waiters = self.waiters.borrow(&irq);
            debug_assert!(
                !waiters.iter().any(|record| record.thread == current),
                "{} already has a pending alarm",
                current
            );
            waiters.push(WaitRecord {
                thread: current.clone(),
                deadline,
            });
        }

        ktrace!(self.trace, ALARM, "{} sleeps at {} until {}", current, now, deadline);
        KThread::sleep();
    }

    /// Cancel the pending wait of `thread` and ready it now
    ///
    /// # Returns
    ///
    /// `true` if the thread had a pending wait, `false` otherwise; in the
    /// latter case nothing changes.
    pub fn cancel(&self, thread: &KThread) -> bool {
        let Some(machine) = self.machine.upgrade() else {
            return false;
        };

        let irq = InterruptGuard::new(machine.interrupt());
        let found = {
            let mut waiters = self.waiters.borrow(&irq);
            match waiters.iter().position(|record| record.thread == *thread) {
                Some(index) => {
                    waiters.swap_remove(index);
                    true
                }
                None => false,
            }
        };

        if found {
            ktrace!(self.trace, ALARM, "{} cancelled at {}", thread, machine.timer().get_time());
            machine.scheduler().ready(thread.clone(), &irq);
        }
        found
    }

    /// Number of outstanding wait records
    pub fn pending(&self) -> usize {
        match self.machine.upgrade() {
            Some(machine) => {
                let irq = InterruptGuard::new(machine.interrupt());
                let count = self.waiters.borrow(&irq).len();
                count
            }
            None => 0,
        }
    }

    /// Whether `thread` has an outstanding wait record
    pub fn is_waiting(&self, thread: &KThread) -> bool {
        match self.machine.upgrade() {
            Some(machine) => {
                let irq = InterruptGuard::new(machine.interrupt());
                let waiting = self
                    .waiters
                    .borrow(&irq)
                    .iter()
                    .any(|record| record.thread == *thread);
                waiting
            }
            None => false,
        }
    }

    fn is_for(&self, machine: &Arc<Machine>) -> bool {
        core::ptr::eq(self.machine.as_ptr(), Arc::as_ptr(machine))
    }
}

impl TimerInterruptHandler for Alarm {
    /// Preempt the running thread, then ready every expired sleeper
    fn timer_interrupt(&self) {
        KThread::yield_now();

        let Some(machine) = self.machine.upgrade() else {
            return;
        };

        let irq = InterruptGuard::new(machine.interrupt());
        let now = machine.timer().get_time();

        let mut due = Vec::new();
        self.waiters.borrow(&irq).retain(|record| {
            if record.deadline <= now {
                due.push(record.thread.clone());
                false
            } else {
                true
            }
        });

        for thread in due {
            ktrace!(self.trace, ALARM, "{} wakes at {}", thread, now);
            machine.scheduler().ready(thread, &irq);
        }
    }

    fn has_pending_work(&self) -> bool {
        self.pending() > 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;

    #[test]
    fn test_alarm_starts_empty() {
        let machine = Machine::new(MachineConfig::default()).unwrap();
        let alarm = Alarm::new(&machine);

        assert_eq!(alarm.pending(), 0);
        assert!(!alarm.has_pending_work());
        assert!(alarm.is_for(&machine));

        let idle = KThread::create(&machine, "idle");
        assert!(!alarm.is_waiting(&idle));
    }

    #[test]
    fn test_alarm_outlives_machine() {
        let machine = Machine::new(MachineConfig::default()).unwrap();
        let alarm = Alarm::new(&machine);
        drop(machine);

        assert_eq!(alarm.pending(), 0);
    }
}
