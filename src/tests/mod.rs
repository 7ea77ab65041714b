// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Integration Tests
//!
//! Whole-machine tests: each one boots a simulated machine, runs kernel
//! threads against the primitives, and checks the outcome of the run.

mod rendezvous_tests;

use std::sync::Arc;

use crate::config::MachineConfig;
use crate::machine::Machine;

/// Machine with the default configuration
fn machine() -> Arc<Machine> {
    Machine::new(MachineConfig::default()).expect("cannot build machine")
}

/// Machine whose timer fires every `interval` ticks
fn machine_with_timer(interval: u64) -> Arc<Machine> {
    Machine::new(MachineConfig::new().with_timer_interval(interval)).expect("cannot build machine")
}
