// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Simulated uniprocessor
//!
//! The machine the synchronization primitives run on: one core, one
//! interrupt enable flag, a tick clock and a periodic timer. Kernel threads
//! are backed by host threads, but exactly one of them holds the core at a
//! time, so every interleaving is decided by the scheduler and the timer.
//!
//! # Lifecycle
//!
//! ```ignore
//! let machine = Machine::new(MachineConfig::default())?;
//! let stats = machine.run(|| {
//!     let child = KThread::fork("child", || { /* ... */ });
//!     child.join();
//! })?;
//! ```
//!
//! [`Machine::run`] returns when the main thread returns, when a kernel
//! thread panics, or when every thread is blocked with nothing pending
//! that could wake one. Threads still blocked at that point stay parked.

pub mod clock;
pub mod interrupt;
pub mod timer;

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub use clock::Clock;
pub use interrupt::{Interrupt, IrqHandler};
pub use timer::{Preemption, Timer};

use crate::config::MachineConfig;
use crate::error::MachineError;
use crate::sched::{KThread, Scheduler, ThreadId};

/// Counters collected over a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineStats {
    /// Clock value when the machine halted
    pub total_ticks: u64,
    /// Switches between distinct threads
    pub context_switches: u64,
    /// Timer interrupts delivered
    pub timer_interrupts: u64,
    /// Kernel threads created, including main
    pub threads_created: u64,
    /// Kernel threads that ran to completion
    pub threads_finished: u64,
}

/// A simulated uniprocessor
pub struct Machine {
    config: MachineConfig,
    clock: Arc<Clock>,
    interrupt: Interrupt,
    timer: Timer,
    scheduler: Scheduler,

    /// Set once by `run`
    started: AtomicBool,

    /// Id of the thread whose return halts the machine
    main: spin::Once<ThreadId>,

    /// Host thread blocked in `run`
    host: spin::Once<std::thread::Thread>,

    /// How the run ended; first writer wins
    outcome: spin::Mutex<Option<Result<(), MachineError>>>,

    context_switches: AtomicU64,
    threads_created: AtomicU64,
    threads_finished: AtomicU64,
}

impl Machine {
    /// Build a machine
    ///
    /// The timer is armed immediately; time does not move until `run`.
    pub fn new(config: MachineConfig) -> Result<Arc<Self>, MachineError> {
        config.validate().map_err(MachineError::InvalidConfig)?;

        let clock = Arc::new(Clock::new());
        let interrupt = Interrupt::new(Arc::clone(&clock), config.system_tick, config.trace);
        let timer = Timer::new(config.timer_interval, Arc::clone(&clock), &interrupt);

        Ok(Arc::new(Self {
            config,
            clock,
            interrupt,
            timer,
            scheduler: Scheduler::new(),
            started: AtomicBool::new(false),
            main: spin::Once::new(),
            host: spin::Once::new(),
            outcome: spin::Mutex::new(None),
            context_switches: AtomicU64::new(0),
            threads_created: AtomicU64::new(0),
            threads_finished: AtomicU64::new(0),
        }))
    }

    /// Machine of the calling kernel thread
    ///
    /// # Panics
    ///
    /// When called from a host thread that is not a kernel thread.
    pub fn current() -> Arc<Machine> {
        KThread::current().machine()
    }

    /// Configuration the machine was built with
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Interrupt controller
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Timer device
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run `main` as the first kernel thread and wait for the machine to halt
    ///
    /// # Returns
    ///
    /// * `Ok(stats)` - `main` returned
    /// * `Err(MachineError::Deadlock)` - every thread blocked for good
    /// * `Err(MachineError::ThreadPanicked)` - a kernel thread panicked
    /// * `Err(MachineError::AlreadyRunning)` - the machine was run before
    pub fn run<F>(self: &Arc<Self>, main: F) -> Result<MachineStats, MachineError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(MachineError::AlreadyRunning);
        }
        self.host.call_once(std::thread::current);

        let thread = KThread::create(self, "main");
        self.main.call_once(|| thread.id());
        thread.boot(main);

        loop {
            let outcome = self.outcome.lock().clone();
            if let Some(outcome) = outcome {
                return outcome.map(|()| self.stats());
            }
            std::thread::park();
        }
    }

    /// Snapshot of the run counters
    pub fn stats(&self) -> MachineStats {
        MachineStats {
            total_ticks: self.clock.now(),
            context_switches: self.context_switches.load(Ordering::Relaxed),
            timer_interrupts: self.timer.interrupts_fired(),
            threads_created: self.threads_created.load(Ordering::Relaxed),
            threads_finished: self.threads_finished.load(Ordering::Relaxed),
        }
    }

    /// Threads created and not yet finished
    pub fn live_threads(&self) -> usize {
        let created = self.threads_created.load(Ordering::Relaxed);
        let finished = self.threads_finished.load(Ordering::Relaxed);
        created.saturating_sub(finished) as usize
    }

    /// Whether the machine has stopped
    pub fn is_halted(&self) -> bool {
        self.outcome.lock().is_some()
    }

    pub(crate) fn is_main(&self, thread: &KThread) -> bool {
        self.main.get() == Some(&thread.id())
    }

    /// Stop the machine and release the host thread blocked in `run`
    pub(crate) fn halt(&self, outcome: Result<(), MachineError>) {
        {
            let mut slot = self.outcome.lock();
            if slot.is_none() {
                ktrace!(self.config.trace, SCHED, "halt at tick {}: {:?}", self.clock.now(), outcome);
                *slot = Some(outcome);
            }
        }
        if let Some(host) = self.host.get() {
            host.unpark();
        }
    }

    pub(crate) fn record_thread_created(&self) {
        self.threads_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_thread_finished(&self) {
        self.threads_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_switch(&self) {
        self.context_switches.fetch_add(1, Ordering::Relaxed);
    }
}
