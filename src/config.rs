// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Machine configuration
//!
//! Tunables for the simulated uniprocessor and the per-subsystem trace
//! switches that gate `log` output.

use bitflags::bitflags;

/// Ticks between two timer interrupts
pub const DEFAULT_TIMER_INTERVAL: u64 = 500;

/// Ticks the clock advances each time interrupts are re-enabled
pub const DEFAULT_SYSTEM_TICK: u64 = 10;

bitflags! {
    /// Subsystems whose activity is traced through `log`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TraceFlags: u32 {
        /// Context switches, forks, idle and deadlock detection
        const SCHED = 1 << 0;
        /// Interrupt delivery and clock jumps
        const INTERRUPT = 1 << 1;
        /// Alarm enqueue, expiry and cancel
        const ALARM = 1 << 2;
        /// Rendezvous join, pairing and departure
        const RENDEZVOUS = 1 << 3;
    }
}

impl TraceFlags {
    /// `log` target used for records of this subsystem
    ///
    /// Combined or empty flag sets map to the crate-wide target.
    pub fn target(self) -> &'static str {
        if self == Self::SCHED {
            "ksync::sched"
        } else if self == Self::INTERRUPT {
            "ksync::interrupt"
        } else if self == Self::ALARM {
            "ksync::alarm"
        } else if self == Self::RENDEZVOUS {
            "ksync::rendezvous"
        } else {
            "ksync"
        }
    }
}

/// Configuration of a simulated machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Ticks between timer interrupts (must be non-zero)
    pub timer_interval: u64,

    /// Clock advance per interrupt re-enable (must be non-zero)
    pub system_tick: u64,

    /// Subsystems to trace
    pub trace: TraceFlags,
}

impl MachineConfig {
    /// Configuration with the default timer interval and system tick
    pub const fn new() -> Self {
        Self {
            timer_interval: DEFAULT_TIMER_INTERVAL,
            system_tick: DEFAULT_SYSTEM_TICK,
            trace: TraceFlags::empty(),
        }
    }

    /// Set the timer interval
    pub const fn with_timer_interval(mut self, ticks: u64) -> Self {
        self.timer_interval = ticks;
        self
    }

    /// Set the system tick
    pub const fn with_system_tick(mut self, ticks: u64) -> Self {
        self.system_tick = ticks;
        self
    }

    /// Set the traced subsystems
    pub const fn with_trace(mut self, trace: TraceFlags) -> Self {
        self.trace = trace;
        self
    }

    /// Check the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Configuration is usable
    /// * `Err(&str)` - Which field is out of range
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.timer_interval == 0 {
            return Err("timer interval cannot be zero");
        }
        if self.system_tick == 0 {
            return Err("system tick cannot be zero");
        }
        Ok(())
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
