// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt traits
//!
//! The seams between the synchronization primitives and the machine they
//! run on. The simulated machine implements both; the guard types in
//! [`crate::interrupt`] only depend on [`InterruptController`].

/// Trait for interrupt controller operations
///
/// Mirrors the enable flag of a single core: there is one interrupt
/// status, and disabling it keeps interrupt handlers from running until
/// it is restored.
pub trait InterruptController {
    /// Disable interrupt delivery
    ///
    /// # Returns
    /// Whether interrupts were enabled before the call
    fn disable(&self) -> bool;

    /// Re-establish a status previously returned by [`disable`]
    ///
    /// Going from disabled to enabled may deliver pending interrupts
    /// before this returns.
    ///
    /// [`disable`]: InterruptController::disable
    fn restore(&self, status: bool);

    /// Whether interrupts are currently enabled
    fn enabled(&self) -> bool;
}

/// Receiver of periodic timer interrupts
///
/// Called in interrupt context with interrupts disabled. Implementations
/// must not sleep; they may yield the running thread.
pub trait TimerInterruptHandler: Send + Sync {
    /// Handle one timer tick
    fn timer_interrupt(&self);

    /// Whether a future tick could make a blocked thread ready
    ///
    /// An idle machine whose handler reports no pending work is deadlocked.
    fn has_pending_work(&self) -> bool {
        false
    }
}
