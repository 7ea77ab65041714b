// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread Context Switch
//!
//! Every kernel thread runs on its own host thread. Saving and restoring
//! CPU state is replaced by a baton: the thread giving up the CPU clears
//! its `running` flag, sets the flag of the next thread, unparks it, and
//! parks until someone hands the baton back.
//!
//! Switches only happen with interrupts disabled, so the interrupt status
//! a resumed thread sees is the one it left with.

use core::sync::atomic::{AtomicBool, Ordering};
use std::thread::Thread;

use super::state::ThreadState;
use super::thread::KThread;

/// ============================================================================
/// Thread Control Block
/// ============================================================================

/// Host side of a kernel thread
pub(crate) struct Tcb {
    /// Host thread backing the kernel thread, set once at spawn
    host: spin::Once<Thread>,

    /// Whether this thread holds the CPU
    running: AtomicBool,
}

impl Tcb {
    pub(crate) const fn new() -> Self {
        Self {
            host: spin::Once::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Bind the host thread
    pub(crate) fn attach(&self, host: Thread) {
        self.host.call_once(|| host);
    }

    /// Give this thread the CPU
    pub(crate) fn resume(&self) {
        self.running.store(true, Ordering::SeqCst);
        if let Some(host) = self.host.get() {
            host.unpark();
        }
    }

    /// Give up the CPU without waiting for it back
    fn release(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Block the calling host thread until this thread holds the CPU
    ///
    /// An unpark that arrives before the park is not lost: the flag is
    /// checked before every park.
    pub(crate) fn wait_for_cpu(&self) {
        while !self.running.load(Ordering::SeqCst) {
            std::thread::park();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// ============================================================================
/// Switch API
/// ============================================================================

/// Switch from the calling thread `from` to `to`
///
/// Returns when `from` is dispatched again. `from`'s state must already
/// be set (ready or blocked) by the caller.
pub(crate) fn context_switch(from: &KThread, to: &KThread) {
    debug_assert!(from.tcb().is_running(), "{} switched away without the CPU", from);
    to.set_state(ThreadState::Running);
    if from.id() == to.id() {
        return;
    }

    let machine = from.machine();
    machine.record_context_switch();
    ktrace!(
        machine.config().trace,
        SCHED,
        "switch {} -> {} at tick {}",
        from,
        to,
        machine.timer().get_time()
    );

    from.tcb().release();
    to.tcb().resume();
    from.tcb().wait_for_cpu();
}

/// Hand the CPU to `to` from a thread that will never run again
pub(crate) fn hand_off(from: &KThread, to: &KThread) {
    to.set_state(ThreadState::Running);

    let machine = from.machine();
    machine.record_context_switch();
    ktrace!(machine.config().trace, SCHED, "{} exits, switch to {}", from, to);

    from.tcb().release();
    to.tcb().resume();
}

// ============================================================================
// Tests
// ============================================================================
