// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Timer Device
//!
//! A periodic timer: it raises an interrupt every `interval` ticks for as
//! long as the machine exists, and forwards each one to the installed
//! [`TimerInterruptHandler`].
//!
//! # Design
//!
//! - **Periodic**: each delivery re-arms the next one before calling out
//! - **Replaceable handler**: the machine boots with a preemption-only
//!   handler; an alarm replaces it when created
//! - **Clock access**: `get_time()` reads the machine clock

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::clock::Clock;
use super::interrupt::Interrupt;
use crate::sched::KThread;
use crate::traits::TimerInterruptHandler;

/// ============================================================================
/// Default handler
/// ============================================================================

/// Handler installed at boot: yields the running thread on every tick
#[derive(Debug, Default)]
pub struct Preemption;

impl TimerInterruptHandler for Preemption {
    fn timer_interrupt(&self) {
        KThread::yield_now();
    }
}

/// ============================================================================
/// Timer
/// ============================================================================

/// State shared with the armed interrupt
struct TimerInner {
    /// Ticks between interrupts
    interval: u64,

    handler: spin::RwLock<Arc<dyn TimerInterruptHandler>>,

    /// Timer interrupts delivered
    fired: AtomicU64,
}

/// Periodic timer device
pub struct Timer {
    inner: Arc<TimerInner>,
    clock: Arc<Clock>,
}

impl Timer {
    /// Create the timer and arm its first interrupt
    pub(crate) fn new(interval: u64, clock: Arc<Clock>, interrupt: &Interrupt) -> Self {
        let inner = Arc::new(TimerInner {
            interval,
            handler: spin::RwLock::new(Arc::new(Preemption)),
            fired: AtomicU64::new(0),
        });
        arm(&inner, interrupt);

        Self { inner, clock }
    }

    /// Current time in ticks
    pub fn get_time(&self) -> u64 {
        self.clock.now()
    }

    /// Ticks between interrupts
    pub fn interval(&self) -> u64 {
        self.inner.interval
    }

    /// Timer interrupts delivered so far
    pub fn interrupts_fired(&self) -> u64 {
        self.inner.fired.load(Ordering::Relaxed)
    }

    /// Replace the interrupt handler
    ///
    /// Takes effect from the next tick.
    pub fn set_interrupt_handler(&self, handler: Arc<dyn TimerInterruptHandler>) {
        *self.inner.handler.write() = handler;
    }

    /// Whether the installed handler still has sleepers to wake
    pub(crate) fn has_pending_work(&self) -> bool {
        let handler = Arc::clone(&*self.inner.handler.read());
        handler.has_pending_work()
    }
}

/// Schedule the next timer interrupt
fn arm(inner: &Arc<TimerInner>, interrupt: &Interrupt) {
    let timer = Arc::clone(inner);
    interrupt.schedule(
        inner.interval,
        "timer",
        Arc::new(move |irq: &Interrupt| {
            arm(&timer, irq);
            timer.fired.fetch_add(1, Ordering::Relaxed);

            // Never call out with the handler lock held: the handler may
            // yield to a thread that installs a new handler.
            let handler = Arc::clone(&*timer.handler.read());
            handler.timer_interrupt();
        }),
    );
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceFlags;
    use crate::traits::InterruptController;

    /// Handler that counts ticks
    #[derive(Default)]
    struct Counting {
        ticks: AtomicU64,
    }

    impl TimerInterruptHandler for Counting {
        fn timer_interrupt(&self) {
            self.ticks.fetch_add(1, Ordering::Relaxed);
        }

        fn has_pending_work(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_timer_periodic() {
        let clock = Arc::new(Clock::new());
        let interrupt = Interrupt::new(Arc::clone(&clock), 10, TraceFlags::empty());
        let timer = Timer::new(500, Arc::clone(&clock), &interrupt);

        let counting = Arc::new(Counting::default());
        timer.set_interrupt_handler(counting.clone());
        assert!(timer.has_pending_work());

        assert!(interrupt.idle());
        assert_eq!(timer.get_time(), 500);
        assert!(interrupt.idle());
        assert_eq!(timer.get_time(), 1000);

        assert_eq!(counting.ticks.load(Ordering::Relaxed), 2);
        assert_eq!(timer.interrupts_fired(), 2);
        // Always re-armed
        assert_eq!(interrupt.pending(), 1);
    }

    #[test]
    fn test_timer_delivered_by_ticks() {
        let clock = Arc::new(Clock::new());
        let interrupt = Interrupt::new(Arc::clone(&clock), 100, TraceFlags::empty());
        let timer = Timer::new(250, Arc::clone(&clock), &interrupt);
        let counting = Arc::new(Counting::default());
        timer.set_interrupt_handler(counting.clone());

        interrupt.enable();
        for _ in 0..5 {
            let status = interrupt.disable();
            interrupt.restore(status);
        }

        // Six ticks of 100: first delivery at 300, re-armed for 550,
        // delivered at 600
        assert_eq!(timer.get_time(), 600);
        assert_eq!(counting.ticks.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_boot_handler_has_no_work() {
        let clock = Arc::new(Clock::new());
        let interrupt = Interrupt::new(Arc::clone(&clock), 10, TraceFlags::empty());
        let timer = Timer::new(500, clock, &interrupt);
        assert!(!timer.has_pending_work());
        assert_eq!(timer.interval(), 500);
    }
}
