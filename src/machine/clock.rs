// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Machine tick counter
//!
//! Monotonically non-decreasing. Advanced by the interrupt controller when
//! interrupts are re-enabled, and moved forward to the next pending
//! interrupt when the machine idles.

use core::sync::atomic::{AtomicU64, Ordering};

/// Simulated time in ticks
#[derive(Debug, Default)]
pub struct Clock {
    ticks: AtomicU64,
}

impl Clock {
    /// Clock starting at tick zero
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Current tick count
    #[inline]
    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Advance by `ticks`, returning the new time
    #[inline]
    pub fn advance(&self, ticks: u64) -> u64 {
        self.ticks.fetch_add(ticks, Ordering::SeqCst) + ticks
    }

    /// Move forward to `when`; never moves backwards
    pub fn advance_to(&self, when: u64) -> u64 {
        self.ticks.fetch_max(when, Ordering::SeqCst).max(when)
    }
}
