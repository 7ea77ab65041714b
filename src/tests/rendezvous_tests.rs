// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rendezvous Integration Tests
//!
//! Pairing, reuse of a tag, independence of tags, and what happens to
//! threads left without a partner.

use std::sync::Arc;

use super::{machine, machine_with_timer};
use crate::error::MachineError;
use crate::sched::{Alarm, KThread};
use crate::sync::{Rendezvous, Tag};

type Log = Arc<spin::Mutex<Vec<(&'static str, i32)>>>;

/// Fork a thread that exchanges `value` on `tag` and logs what it got
fn exchanger(rendezvous: &Arc<Rendezvous>, log: &Log, name: &'static str, tag: Tag, value: i32) -> KThread {
    let rendezvous = Arc::clone(rendezvous);
    let log = Arc::clone(log);
    KThread::fork(name, move || {
        let received = rendezvous.exchange(tag, value);
        log.lock().push((name, received));
    })
}

fn received(log: &Log, name: &str) -> Option<i32> {
    log.lock()
        .iter()
        .find(|(who, _)| *who == name)
        .map(|&(_, value)| value)
}

/// Test the basic two-thread exchange
#[test]
fn test_exchange_pair() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    machine
        .run(move || {
            let t1 = exchanger(&r, &l, "t1", 0, -1);
            let t2 = exchanger(&r, &l, "t2", 0, 1);
            t1.join();
            t2.join();
            assert_eq!(r.waiting(0), 0);
        })
        .unwrap();

    assert_eq!(received(&log, "t1"), Some(1));
    assert_eq!(received(&log, "t2"), Some(-1));
}

/// Test the exchange does not depend on call order
#[test]
fn test_exchange_reversed_order() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    machine
        .run(move || {
            let t2 = exchanger(&r, &l, "t2", 0, 1);
            let t1 = exchanger(&r, &l, "t1", 0, -1);
            t2.join();
            t1.join();
        })
        .unwrap();

    assert_eq!(received(&log, "t1"), Some(1));
    assert_eq!(received(&log, "t2"), Some(-1));
}

/// Test the calling thread can take part in an exchange
#[test]
fn test_exchange_with_main() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());

    machine
        .run(move || {
            let peer = {
                let r = Arc::clone(&rendezvous);
                KThread::fork("peer", move || assert_eq!(r.exchange(7, 70), 700))
            };
            assert_eq!(rendezvous.exchange(7, 700), 70);
            peer.join();
        })
        .unwrap();
}

/// Test a tag can be reused once a pair has left
#[test]
fn test_tag_reuse() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    machine
        .run(move || {
            for (a, b) in [("a1", "b1"), ("a2", "b2")] {
                let ta = exchanger(&r, &l, a, 5, 1);
                let tb = exchanger(&r, &l, b, 5, 2);
                ta.join();
                tb.join();
                assert_eq!(r.waiting(5), 0);
            }
            assert_eq!(r.tags(), 1);
        })
        .unwrap();

    for name in ["a1", "a2"] {
        assert_eq!(received(&log, name), Some(2));
    }
    for name in ["b1", "b2"] {
        assert_eq!(received(&log, name), Some(1));
    }
}

/// Test exchanges on different tags do not interact
#[test]
fn test_independent_tags() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    machine
        .run(move || {
            let threads = [
                exchanger(&r, &l, "x1", 1, 10),
                exchanger(&r, &l, "x2", 2, 20),
                exchanger(&r, &l, "y1", 1, 11),
                exchanger(&r, &l, "y2", 2, 21),
            ];
            for thread in &threads {
                thread.join();
            }
            assert_eq!(r.tags(), 2);
            assert_eq!(r.waiting(1), 0);
            assert_eq!(r.waiting(2), 0);
            assert_eq!(r.waiting(3), 0);
        })
        .unwrap();

    assert_eq!(received(&log, "x1"), Some(11));
    assert_eq!(received(&log, "y1"), Some(10));
    assert_eq!(received(&log, "x2"), Some(21));
    assert_eq!(received(&log, "y2"), Some(20));
}

/// Test a waiting tag does not hold up other tags
#[test]
fn test_blocked_tag_does_not_block_others() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    let result = machine.run(move || {
        let lone = exchanger(&r, &l, "lone", 1, 0);
        let a = exchanger(&r, &l, "a", 2, 1);
        let b = exchanger(&r, &l, "b", 2, 2);
        a.join();
        b.join();
        assert_eq!(r.waiting(1), 1);
        lone.join();
    });

    assert_eq!(result, Err(MachineError::Deadlock { blocked: 2 }));
    assert_eq!(received(&log, "a"), Some(2));
    assert_eq!(received(&log, "b"), Some(1));
    assert_eq!(received(&log, "lone"), None);
}

/// Test a third thread waits for the pair ahead of it, then pairs with
/// the next arrival
#[test]
fn test_third_thread_pairs_with_fourth() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    machine
        .run(move || {
            let first = [
                exchanger(&r, &l, "p", 0, 1),
                exchanger(&r, &l, "q", 0, 2),
                exchanger(&r, &l, "r", 0, 3),
            ];
            for thread in &first[..2] {
                thread.join();
            }
            assert_eq!(r.waiting(0), 1);

            let s = exchanger(&r, &l, "s", 0, 4);
            first[2].join();
            s.join();
        })
        .unwrap();

    assert_eq!(received(&log, "p"), Some(2));
    assert_eq!(received(&log, "q"), Some(1));
    assert_eq!(received(&log, "r"), Some(4));
    assert_eq!(received(&log, "s"), Some(3));
}

/// Test a lone exchange never returns and the machine reports it
#[test]
fn test_lone_exchange_deadlocks() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    let result = machine.run(move || {
        exchanger(&r, &l, "lone", 0, 42).join();
    });

    assert_eq!(result, Err(MachineError::Deadlock { blocked: 2 }));
    assert!(log.lock().is_empty());
}

/// Test an odd thread out is left blocked, with an alarm installed
#[test]
fn test_odd_thread_out_deadlocks() {
    let machine = machine();
    let _alarm = Alarm::new(&machine);
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    let result = machine.run(move || {
        let threads = [
            exchanger(&r, &l, "t1", 0, 1),
            exchanger(&r, &l, "t2", 0, 2),
            exchanger(&r, &l, "t3", 0, 3),
        ];
        for thread in &threads {
            thread.join();
        }
    });

    assert_eq!(result, Err(MachineError::Deadlock { blocked: 2 }));
    assert_eq!(received(&log, "t1"), Some(2));
    assert_eq!(received(&log, "t2"), Some(1));
    assert_eq!(received(&log, "t3"), None);
}

/// Test many threads on one tag pair up completely, each value delivered
/// exactly once, under heavy timer preemption
#[test]
fn test_many_threads_one_tag() {
    const NAMES: [&str; 10] = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7", "n8", "n9"];

    // Preempt every few lock operations
    let machine = machine_with_timer(30);
    let rendezvous: Arc<Rendezvous> = Arc::new(Rendezvous::new());
    let log: Log = Arc::new(spin::Mutex::new(Vec::new()));

    let (r, l) = (Arc::clone(&rendezvous), Arc::clone(&log));
    machine
        .run(move || {
            let threads: Vec<_> = NAMES
                .iter()
                .enumerate()
                .map(|(value, &name)| exchanger(&r, &l, name, 0, value as i32))
                .collect();
            for thread in &threads {
                thread.join();
            }
            assert_eq!(r.waiting(0), 0);
        })
        .unwrap();

    let log = log.lock();
    assert_eq!(log.len(), NAMES.len());

    let mut got: Vec<i32> = log.iter().map(|&(_, value)| value).collect();
    got.sort_unstable();
    assert_eq!(got, (0..NAMES.len() as i32).collect::<Vec<_>>());

    // Partners are symmetric: whoever sent x and got y pairs with whoever
    // sent y and got x
    for &(name, value) in log.iter() {
        let sent = NAMES.iter().position(|&n| n == name).unwrap() as i32;
        assert_ne!(sent, value);
        let partner = NAMES[value as usize];
        assert_eq!(received_from(&log, partner), Some(sent));
    }
}

fn received_from(log: &[(&'static str, i32)], name: &str) -> Option<i32> {
    log.iter().find(|(who, _)| *who == name).map(|&(_, value)| value)
}

/// Test values are moved, not copied
#[test]
fn test_exchange_owned_values() {
    let machine = machine();
    let rendezvous: Arc<Rendezvous<String>> = Arc::new(Rendezvous::new());

    machine
        .run(move || {
            let peer = {
                let r = Arc::clone(&rendezvous);
                KThread::fork("peer", move || {
                    assert_eq!(r.exchange(-3, String::from("pong")), "ping");
                })
            };
            assert_eq!(rendezvous.exchange(-3, String::from("ping")), "pong");
            peer.join();
        })
        .unwrap();
}
