// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scoped interrupt masking
//!
//! [`InterruptGuard`] disables interrupts for the lifetime of the guard and
//! restores the status that was in effect before, on every exit path. Nested
//! guards are cheap: an inner guard sees interrupts already disabled and
//! restores "disabled" when it drops.
//!
//! [`InterruptCell`] holds data that may only be touched with interrupts
//! disabled. Borrowing it requires a live guard, so the critical section
//! is visible in the signature.
//!
//! # Usage
//!
//! ```ignore
//! let irq = InterruptGuard::new(machine.interrupt());
//! cell.borrow(&irq).push(record);
//! // interrupts restored here
//! ```

use crate::machine::Interrupt;
use crate::traits::InterruptController;

/// RAII bracket around a disabled-interrupt section
pub struct InterruptGuard<'a, C: InterruptController + ?Sized = Interrupt> {
    controller: &'a C,
    previous: bool,
}

impl<'a, C: InterruptController + ?Sized> InterruptGuard<'a, C> {
    /// Disable interrupts on `controller` until the guard drops
    pub fn new(controller: &'a C) -> Self {
        let previous = controller.disable();
        Self {
            controller,
            previous,
        }
    }

    /// Status that will be restored on drop
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl<C: InterruptController + ?Sized> Drop for InterruptGuard<'_, C> {
    fn drop(&mut self) {
        self.controller.restore(self.previous);
    }
}

/// Data accessible only inside a disabled-interrupt section
///
/// On one core, masking interrupts is enough for exclusion against the
/// interrupt handler. The inner spin lock is never contended; it keeps the
/// type sound when kernel threads are backed by host threads.
pub struct InterruptCell<T> {
    data: spin::Mutex<T>,
}

impl<T> InterruptCell<T> {
    /// Wrap a value
    pub const fn new(value: T) -> Self {
        Self {
            data: spin::Mutex::new(value),
        }
    }

    /// Borrow the data for as long as `guard` keeps interrupts disabled
    ///
    /// The returned borrow must be dropped before the thread sleeps or
    /// yields.
    pub fn borrow<'a, C: InterruptController + ?Sized>(
        &'a self,
        guard: &'a InterruptGuard<'_, C>,
    ) -> spin::MutexGuard<'a, T> {
        debug_assert!(
            !guard.controller.enabled(),
            "interrupt cell borrowed with interrupts enabled"
        );
        self.data.try_lock().expect("interrupt cell borrowed twice")
    }

    /// Consume the cell
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for InterruptCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
