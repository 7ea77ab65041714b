// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Machine errors
//!
//! The synchronization primitives themselves have no recoverable errors.
//! What can go wrong is the run as a whole, and that is reported here.

use core::fmt;

/// Why a machine run did not complete normally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// The configuration was rejected
    InvalidConfig(&'static str),

    /// `Machine::run` was called on a machine that already ran
    AlreadyRunning,

    /// No thread is ready and nothing pending can ever ready one
    Deadlock {
        /// Kernel threads left blocked
        blocked: usize,
    },

    /// A kernel thread panicked
    ThreadPanicked {
        /// Name of the thread
        name: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid machine config: {reason}"),
            Self::AlreadyRunning => f.write_str("machine already ran"),
            Self::Deadlock { blocked } => {
                write!(f, "deadlock: no runnable thread, {blocked} blocked")
            }
            Self::ThreadPanicked { name, message } => {
                write!(f, "kernel thread '{name}' panicked: {message}")
            }
        }
    }
}

impl std::error::Error for MachineError {}
