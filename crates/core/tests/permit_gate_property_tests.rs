//! Property tests for the permit gate shared by catalog queries.

use eventwise_upstream::PermitGate;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Acquire,
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Acquire), (0usize..16).prop_map(Op::Release)]
}

proptest! {
    #[test]
    fn available_permits_stay_within_capacity(
        capacity in 1usize..8,
        ops in prop::collection::vec(op(), 0..64),
    ) {
        let gate = PermitGate::new(capacity);
        let mut held = Vec::new();

        for op in ops {
            match op {
                Op::Acquire => match gate.try_acquire().unwrap() {
                    Some(guard) => held.push(guard),
                    None => prop_assert_eq!(held.len(), capacity),
                },
                Op::Release(index) => {
                    if !held.is_empty() {
                        let index = index % held.len();
                        drop(held.swap_remove(index));
                    }
                }
            }

            prop_assert!(gate.available_permits() <= capacity);
            prop_assert_eq!(gate.available_permits() + held.len(), capacity);
            prop_assert_eq!(gate.in_flight(), held.len());
        }

        drop(held);
        prop_assert_eq!(gate.available_permits(), capacity);
    }

    #[test]
    fn concurrent_runs_never_exceed_capacity(capacity in 1usize..5, tasks in 1usize..24) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_time()
            .build()
            .unwrap();

        let peak = runtime.block_on(async move {
            use std::sync::atomic::{AtomicUsize, Ordering};
            use std::sync::Arc;

            let gate = PermitGate::new(capacity);
            let active = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..tasks)
                .map(|_| {
                    let gate = gate.clone();
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    tokio::spawn(async move {
                        gate.run(async {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                    })
                })
                .collect();

            for handle in handles {
                handle.await.unwrap().unwrap();
            }
            assert_eq!(gate.available_permits(), capacity);
            peak.load(Ordering::SeqCst)
        });

        prop_assert!(peak <= capacity);
        prop_assert!(peak >= 1);
    }
}
