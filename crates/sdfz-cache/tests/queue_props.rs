//! Property tests for the work queue against a simple model.

use std::collections::HashSet;

use proptest::prelude::*;
use sdfz_cache::{WorkItem, WorkQueue};

#[derive(Clone, Debug)]
enum Op {
    Enqueue(u8),
    Remove(u8),
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..8).prop_map(Op::Enqueue),
        2 => (0u8..8).prop_map(Op::Remove),
        2 => Just(Op::Pop),
    ]
}

fn name(n: u8) -> String {
    format!("{n}.sdfz")
}

proptest! {
    #[test]
    fn a_name_is_never_both_pending_and_removed(ops in proptest::collection::vec(op(), 0..64)) {
        let queue = WorkQueue::new();
        for op in ops {
            match op {
                Op::Enqueue(n) => { queue.enqueue(name(n)); }
                Op::Remove(n) => { queue.enqueue_removal(name(n)); }
                Op::Pop => { queue.pop(); }
            }
        }
        let mut ingest = HashSet::new();
        let mut remove = HashSet::new();
        let len = queue.len();
        let mut popped = 0;
        while let Some(item) = queue.pop() {
            popped += 1;
            match item {
                WorkItem::Ingest(n) => prop_assert!(ingest.insert(n)),
                WorkItem::Remove(n) => prop_assert!(remove.insert(n)),
            }
        }
        prop_assert_eq!(popped, len);
        prop_assert!(ingest.is_disjoint(&remove));
    }

    #[test]
    fn last_request_for_a_name_wins(ops in proptest::collection::vec(op(), 1..64)) {
        let queue = WorkQueue::new();
        let mut last: [Option<bool>; 8] = [None; 8];
        for op in &ops {
            match *op {
                Op::Enqueue(n) => { queue.enqueue(name(n)); last[n as usize] = Some(true); }
                Op::Remove(n) => { queue.enqueue_removal(name(n)); last[n as usize] = Some(false); }
                Op::Pop => {
                    if let Some(item) = queue.pop() {
                        let n = match &item {
                            WorkItem::Ingest(s) | WorkItem::Remove(s) => s.clone(),
                        };
                        let idx: usize = n.trim_end_matches(".sdfz").parse().unwrap();
                        last[idx] = None;
                    }
                }
            }
        }
        for (n, want) in last.iter().enumerate() {
            match want {
                Some(true) => prop_assert!(queue.is_pending(&name(n as u8))),
                _ => prop_assert!(!queue.is_pending(&name(n as u8))),
            }
        }
    }
}
