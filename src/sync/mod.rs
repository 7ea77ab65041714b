// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! Blocking primitives for kernel threads. All of them put waiters to
//! sleep through the scheduler rather than spinning.
//!
//! # Primitives
//!
//! - **WaitQueue**: FIFO queue of blocked threads
//! - **Lock**: sleeping mutual exclusion with direct hand-off
//! - **Condition**: Mesa-style condition variable over a `Lock`
//! - **Rendezvous**: pairwise synchronous value exchange per tag

pub mod condition;
pub mod lock;
pub mod rendezvous;
pub mod wait_queue;

// Re-exports
pub use condition::Condition;
pub use lock::{Lock, LockGuard};
pub use rendezvous::{Rendezvous, Tag};
pub use wait_queue::WaitQueue;
