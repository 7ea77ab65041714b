// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # ksync - Kernel synchronization on a simulated uniprocessor
//!
//! Two thread-synchronization primitives and the small machine they run on:
//!
//! - **Alarm**: timed sleep, woken by the periodic timer interrupt
//! - **Rendezvous**: synchronous pairwise value exchange over independent tags
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── machine/           # Simulated core: clock, interrupt controller, timer
//! ├── interrupt/         # Scoped interrupt masking (guard + cell)
//! ├── sched/             # Kernel threads, ready queue, context switch, Alarm
//! ├── sync/              # Wait queue, Lock, Condition, Rendezvous
//! ├── config.rs          # Machine configuration and trace flags
//! ├── error.rs           # Machine errors
//! └── traits.rs          # Interrupt controller / timer handler seams
//! ```
//!
//! ## Execution model
//!
//! Kernel threads are backed by host threads, but exactly one of them runs
//! at a time. Time advances each time interrupts are re-enabled and jumps
//! forward when every thread is blocked; the timer interrupt preempts the
//! running thread.
//!
//! ```ignore
//! use ksync::{Alarm, KThread, Machine, MachineConfig, Rendezvous};
//! use std::sync::Arc;
//!
//! let machine = Machine::new(MachineConfig::default())?;
//! let alarm = Alarm::new(&machine);
//! let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
//!
//! machine.run(move || {
//!     let r = Arc::clone(&rendezvous);
//!     let peer = KThread::fork("peer", move || assert_eq!(r.exchange(0, 1), -1));
//!     alarm.wait_until(1_000);
//!     assert_eq!(rendezvous.exchange(0, -1), 1);
//!     peer.join();
//! })?;
//! ```
//!
//! ## Tracing
//!
//! Subsystems log through the `log` facade when their bit is set in
//! [`MachineConfig::trace`]. The library installs no logger.

/// Emit a `log::debug!` record when `$flag` is set in `$flags`
macro_rules! ktrace {
    ($flags:expr, $flag:ident, $($arg:tt)+) => {
        if $flags.contains($crate::config::TraceFlags::$flag) {
            log::debug!(target: $crate::config::TraceFlags::$flag.target(), $($arg)+);
        }
    };
}

pub mod config;
pub mod error;
pub mod interrupt;
pub mod machine;
pub mod sched;
pub mod sync;
pub mod traits;

#[cfg(test)]
mod tests;

pub use config::{MachineConfig, TraceFlags, DEFAULT_SYSTEM_TICK, DEFAULT_TIMER_INTERVAL};
pub use error::MachineError;
pub use interrupt::{InterruptCell, InterruptGuard};
pub use machine::{Machine, MachineStats};
pub use sched::{Alarm, KThread, ThreadId, ThreadState};
pub use sync::{Condition, Lock, LockGuard, Rendezvous, Tag, WaitQueue};
pub use traits::{InterruptController, TimerInterruptHandler};
