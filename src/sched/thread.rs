// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread representation and management
//!
//! [`KThread`] is a cheap handle to a kernel thread. Handles are shared
//! between the ready queue, wait queues, alarm records and joiners; the
//! thread itself lives until the last handle drops.
//!
//! # Lifecycle
//!
//! ```text
//! New -> Ready <-> Running -> Finished
//!          ^          |
//!          +- Blocked +
//! ```
//!
//! A thread starts with interrupts enabled. It gives up the CPU only by
//! yielding (timer preemption or explicitly), by sleeping, or by returning.

use core::cell::RefCell;
use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use super::state::ThreadState;
use super::switch::{self, Tcb};
use crate::error::MachineError;
use crate::interrupt::InterruptGuard;
use crate::machine::Machine;
use crate::traits::InterruptController;

/// Thread ID type
pub type ThreadId = u64;

/// Allocate a new thread ID
pub fn new_thread_id() -> ThreadId {
    use core::sync::atomic::{AtomicU64, Ordering};

    static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

    NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    /// Kernel thread bound to the calling host thread
    static CURRENT: RefCell<Option<KThread>> = const { RefCell::new(None) };
}

struct ThreadInner {
    id: ThreadId,
    name: String,

    /// Owning machine; weak so parked threads do not keep it alive
    machine: Weak<Machine>,

    state: spin::Mutex<ThreadState>,

    /// Thread blocked in `join` on this one
    joiner: spin::Mutex<Option<KThread>>,

    tcb: Tcb,
}

/// Handle to a kernel thread
#[derive(Clone)]
pub struct KThread {
    inner: Arc<ThreadInner>,
}

impl KThread {
    /// The thread running on the calling host thread
    ///
    /// # Panics
    ///
    /// When the caller is not a kernel thread.
    pub fn current() -> KThread {
        Self::try_current().expect("not running on a kernel thread")
    }

    /// The running kernel thread, if the caller is one
    pub fn try_current() -> Option<KThread> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Create a thread running `body` and make it ready
    ///
    /// The new thread runs on the caller's machine once the scheduler
    /// picks it.
    pub fn fork<F>(name: &str, body: F) -> KThread
    where
        F: FnOnce() + Send + 'static,
    {
        let machine = Machine::current();
        let thread = Self::create(&machine, name);
        thread.spawn(body);
        thread.ready();
        thread
    }

    /// Allocate a thread record on `machine`
    pub(crate) fn create(machine: &Arc<Machine>, name: &str) -> KThread {
        machine.record_thread_created();
        let thread = KThread {
            inner: Arc::new(ThreadInner {
                id: new_thread_id(),
                name: name.to_string(),
                machine: Arc::downgrade(machine),
                state: spin::Mutex::new(ThreadState::New),
                joiner: spin::Mutex::new(None),
                tcb: Tcb::new(),
            }),
        };
        ktrace!(machine.config().trace, SCHED, "created {}", thread);
        thread
    }

    /// Start the thread on its host thread and give it the CPU at once
    ///
    /// Used for the first thread of a machine, which is dispatched
    /// without going through the ready queue.
    pub(crate) fn boot<F>(&self, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(body);
        self.inner.tcb.resume();
    }

    /// Create the backing host thread, parked until dispatched
    fn spawn<F>(&self, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let thread = self.clone();
        let builder = std::thread::Builder::new().name(self.inner.name.clone());
        let handle = builder
            .spawn(move || thread.run(body))
            .expect("cannot spawn host thread");
        self.inner.tcb.attach(handle.thread().clone());
    }

    /// Host thread body
    fn run<F: FnOnce()>(self, body: F) {
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
        self.inner.tcb.wait_for_cpu();

        let Some(machine) = self.inner.machine.upgrade() else {
            return;
        };

        self.set_state(ThreadState::Running);
        machine.interrupt().enable();

        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(()) => self.finish(&machine),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                ktrace!(machine.config().trace, SCHED, "{} panicked: {}", self, message);
                machine.halt(Err(MachineError::ThreadPanicked {
                    name: self.inner.name.clone(),
                    message,
                }));
            }
        }

        CURRENT.with(|current| current.borrow_mut().take());
    }

    /// Terminate the calling thread and dispatch the next one
    ///
    /// Interrupts are left disabled: the next thread restores its own
    /// status when it resumes.
    fn finish(&self, machine: &Arc<Machine>) {
        machine.interrupt().disable();

        self.set_state(ThreadState::Finished);
        machine.record_thread_finished();
        ktrace!(machine.config().trace, SCHED, "{} finished", self);

        let joiner = self.inner.joiner.lock().take();
        if let Some(joiner) = joiner {
            joiner.ready();
        }

        if machine.is_main(self) {
            machine.halt(Ok(()));
            return;
        }

        if let Some(next) = machine.scheduler().next_thread(machine) {
            switch::hand_off(self, &next);
        }
    }

    /// Move this thread to the ready queue
    ///
    /// # Panics
    ///
    /// When the thread is already ready or has finished.
    pub fn ready(&self) {
        let machine = self.machine();
        let irq = InterruptGuard::new(machine.interrupt());
        machine.scheduler().ready(self.clone(), &irq);
    }

    /// Block the calling thread until another thread readies it
    ///
    /// Must be called with interrupts disabled; whoever will wake the
    /// thread must already be able to find it.
    pub fn sleep() {
        let current = Self::current();
        let machine = current.machine();
        assert!(
            !machine.interrupt().enabled(),
            "thread sleep with interrupts enabled"
        );

        current.set_state(ThreadState::Blocked);
        ktrace!(machine.config().trace, SCHED, "{} blocked", current);

        match machine.scheduler().next_thread(&machine) {
            Some(next) => switch::context_switch(&current, &next),
            None => park_forever(),
        }
    }

    /// Let the next ready thread run
    ///
    /// No-op unless the caller is a running kernel thread, so interrupt
    /// handlers may call it while the machine idles.
    pub fn yield_now() {
        let Some(current) = Self::try_current() else {
            return;
        };
        if current.state() != ThreadState::Running {
            return;
        }

        let machine = current.machine();
        let irq = InterruptGuard::new(machine.interrupt());
        let next = machine.scheduler().dequeue(&irq);
        if let Some(next) = next {
            machine.scheduler().ready(current.clone(), &irq);
            switch::context_switch(&current, &next);
        }
    }

    /// Wait for this thread to finish
    ///
    /// # Panics
    ///
    /// When a thread joins itself, or a second joiner arrives.
    pub fn join(&self) {
        let current = Self::current();
        assert!(current.id() != self.id(), "thread {} joined itself", self);

        let machine = self.machine();
        let _irq = InterruptGuard::new(machine.interrupt());
        if self.state() == ThreadState::Finished {
            return;
        }

        {
            let mut joiner = self.inner.joiner.lock();
            assert!(joiner.is_none(), "thread {} joined twice", self);
            *joiner = Some(current);
        }
        Self::sleep();
    }

    /// Thread ID
    pub fn id(&self) -> ThreadId {
        self.inner.id
    }

    /// Thread name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state
    pub fn state(&self) -> ThreadState {
        *self.inner.state.lock()
    }

    pub(crate) fn set_state(&self, state: ThreadState) {
        *self.inner.state.lock() = state;
    }

    /// Machine the thread runs on
    ///
    /// # Panics
    ///
    /// When the machine has been dropped.
    pub fn machine(&self) -> Arc<Machine> {
        self.inner.machine.upgrade().expect("thread outlived its machine")
    }

    pub(crate) fn tcb(&self) -> &Tcb {
        &self.inner.tcb
    }
}

impl PartialEq for KThread {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for KThread {}

impl fmt::Display for KThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inner.name, self.inner.id)
    }
}

impl fmt::Debug for KThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KThread")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Park a host thread whose kernel thread can never run again
fn park_forever() -> ! {
    loop {
        std::thread::park();
    }
}

/// Text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

// ============================================================================
// Tests
// ============================================================================
