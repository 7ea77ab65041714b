// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Simulated interrupt controller
//!
//! One enable flag for the single core, and a queue of pending interrupts
//! ordered by the tick at which they are due.
//!
//! # Time
//!
//! Simulated time only moves in two places:
//!
//! - every disabled -> enabled transition advances the clock by one system
//!   tick and then delivers whatever became due;
//! - [`Interrupt::idle`], used when no thread is ready, jumps the clock to
//!   the earliest pending interrupt and delivers it.
//!
//! Handlers run with interrupts disabled on the host thread of whichever
//! kernel thread triggered delivery. A handler may yield that thread; the
//! rest of the delivery loop continues when it is dispatched again.

use core::cmp::{Ordering as CmpOrdering, Reverse};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::clock::Clock;
use crate::config::TraceFlags;
use crate::traits::InterruptController;

/// Interrupt service routine
pub type IrqHandler = Arc<dyn Fn(&Interrupt) + Send + Sync>;

/// An interrupt waiting for its tick
struct PendingInterrupt {
    /// Tick at which the interrupt is due
    when: u64,

    /// Schedule order, breaks ties between equal `when`
    seq: u64,

    /// Device name, for tracing
    name: &'static str,

    handler: IrqHandler,
}

impl PartialEq for PendingInterrupt {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.seq == other.seq
    }
}

impl Eq for PendingInterrupt {}

impl PartialOrd for PendingInterrupt {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingInterrupt {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.when, self.seq).cmp(&(other.when, other.seq))
    }
}

/// Interrupt controller of the simulated core
pub struct Interrupt {
    /// Interrupt enable flag; the machine boots with interrupts disabled
    enabled: AtomicBool,

    clock: Arc<Clock>,

    /// Clock advance per re-enable
    system_tick: u64,

    trace: TraceFlags,

    /// Min-heap of pending interrupts
    pending: spin::Mutex<BinaryHeap<Reverse<PendingInterrupt>>>,

    next_seq: AtomicU64,

    /// Interrupts delivered so far
    delivered: AtomicU64,
}

impl Interrupt {
    /// Create a controller with interrupts disabled
    pub(crate) fn new(clock: Arc<Clock>, system_tick: u64, trace: TraceFlags) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            clock,
            system_tick,
            trace,
            pending: spin::Mutex::new(BinaryHeap::new()),
            next_seq: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Schedule `handler` to run `delay` ticks from now
    pub fn schedule(&self, delay: u64, name: &'static str, handler: IrqHandler) {
        let when = self.clock.now().saturating_add(delay);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().push(Reverse(PendingInterrupt {
            when,
            seq,
            name,
            handler,
        }));
    }

    /// Enable interrupts
    pub fn enable(&self) {
        self.restore(true);
    }

    /// Current time
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Number of interrupts waiting to be delivered
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of interrupts delivered so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Advance one system tick and deliver what became due
    fn tick(&self) {
        let now = self.clock.advance(self.system_tick);

        self.enabled.store(false, Ordering::SeqCst);
        self.fire_due(now);
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Deliver every interrupt due at or before `now`, earliest first
    fn fire_due(&self, now: u64) {
        loop {
            let due = {
                let mut pending = self.pending.lock();
                let is_due = pending.peek().map_or(false, |Reverse(next)| next.when <= now);
                if is_due {
                    pending.pop()
                } else {
                    None
                }
            };

            // The pending lock is released before the handler runs: the
            // handler reschedules itself and may switch threads.
            let Some(Reverse(irq)) = due else { break };

            self.delivered.fetch_add(1, Ordering::Relaxed);
            ktrace!(
                self.trace,
                INTERRUPT,
                "{} interrupt at tick {} (due {})",
                irq.name,
                now,
                irq.when
            );
            (irq.handler)(self);
        }
    }

    /// Jump to the next pending interrupt and deliver it
    ///
    /// Called with interrupts disabled when no thread is ready.
    ///
    /// # Returns
    ///
    /// `false` if nothing is pending, so idling cannot make progress
    pub(crate) fn idle(&self) -> bool {
        debug_assert!(!self.enabled(), "idle with interrupts enabled");

        let next = self.pending.lock().peek().map(|Reverse(irq)| irq.when);
        let Some(when) = next else {
            return false;
        };

        let now = self.clock.advance_to(when);
        ktrace!(self.trace, INTERRUPT, "idle: clock advanced to {}", now);
        self.fire_due(now);
        true
    }
}

impl InterruptController for Interrupt {
    fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::SeqCst)
    }

    fn restore(&self, status: bool) {
        let was = self.enabled.swap(status, Ordering::SeqCst);

        // No delivery while unwinding: a handler could switch threads
        // in the middle of a panic.
        if status && !was && !std::thread::panicking() {
            self.tick();
        }
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
