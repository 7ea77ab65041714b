// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread state and run queue
//!
//! Defines thread states and the ready queue of the scheduler.

use std::collections::VecDeque;

use super::thread::KThread;

/// Thread states
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Created, not yet scheduled
    New,
    /// Thread is ready to run
    Ready,
    /// Thread is currently running
    Running,
    /// Thread is blocked (alarm, lock, condition, join)
    Blocked,
    /// Thread has returned from its body
    Finished,
}

/// Run queue
///
/// Plain FIFO: threads run in the order they became ready.
#[derive(Default)]
pub struct RunQueue {
    threads: VecDeque<KThread>,
}

impl RunQueue {
    /// Create a new empty run queue
    pub const fn new() -> Self {
        Self {
            threads: VecDeque::new(),
        }
    }

    /// Add a thread at the tail
    pub fn enqueue(&mut self, thread: KThread) {
        self.threads.push_back(thread);
    }

    /// Remove the next thread to run
    pub fn dequeue(&mut self) -> Option<KThread> {
        self.threads.pop_front()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::MachineConfig;
    use crate::machine::Machine;

    #[test]
    fn test_run_queue_fifo() {
        let machine = Machine::new(MachineConfig::default()).unwrap();
        let (a, b) = (KThread::create(&machine, "a"), KThread::create(&machine, "b"));

        let mut queue = RunQueue::new();
        assert!(queue.dequeue().is_none());

        queue.enqueue(a.clone());
        queue.enqueue(b.clone());
        assert_eq!(queue.dequeue(), Some(a));
        assert_eq!(queue.dequeue(), Some(b));
        assert!(queue.dequeue().is_none());
    }
}
