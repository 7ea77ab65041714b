// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler and thread management
//!
//! Kernel threads, the FIFO ready queue, the context switch and the alarm
//! built on the timer interrupt.
//!
//! # Example
//! ```ignore
//! use ksync::sched::{Alarm, KThread};
//!
//! let alarm = Alarm::new(&machine);
//! machine.run(move || {
//!     let sleeper = KThread::fork("sleeper", move || alarm.wait_until(1_000));
//!     sleeper.join();
//! })?;
//! ```

pub mod alarm;
pub mod scheduler;
pub mod state;
pub mod switch;
pub mod thread;

pub use alarm::Alarm;
pub use scheduler::Scheduler;
pub use state::{RunQueue, ThreadState};
pub use thread::{new_thread_id, KThread, ThreadId};
