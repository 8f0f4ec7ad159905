//! Property-based tests for the trailing snapshot debounce.
//!
//! These tests verify that a burst of schedule calls closer together than the
//! window collapses into a single run, and that every quiet gap longer than
//! the window lets exactly one run through.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tabsync::sync::debounce::Debouncer;

const WINDOW_MS: u64 = 2000;

/// Gaps between schedule calls, kept clear of the exact window boundary.
fn arb_gaps() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(
        prop_oneof![
            4 => 0..1900u64,
            1 => 2100..6000u64,
        ],
        0..40,
    )
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

// *For any* sequence of gaps between schedule calls, the action runs once per
// gap that exceeds the window, plus once after the final call.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn runs_once_per_quiet_period(gaps in arb_gaps()) {
        let expected = gaps.iter().filter(|g| **g > WINDOW_MS).count() + 1;

        let fired = paused_runtime().block_on(async {
            let fired = Arc::new(AtomicUsize::new(0));
            let mut debouncer = Debouncer::new(Duration::from_millis(WINDOW_MS));
            let schedule = |debouncer: &mut Debouncer| {
                let fired = Arc::clone(&fired);
                debouncer.reschedule(move || async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                });
            };

            for gap in &gaps {
                schedule(&mut debouncer);
                tokio::time::sleep(Duration::from_millis(*gap)).await;
            }
            schedule(&mut debouncer);
            tokio::time::sleep(Duration::from_millis(WINDOW_MS + 100)).await;
            fired.load(Ordering::SeqCst)
        });

        prop_assert_eq!(fired, expected);
    }

    #[test]
    fn cancel_suppresses_pending_run(gaps in prop::collection::vec(0..1900u64, 1..20)) {
        let fired = paused_runtime().block_on(async {
            let fired = Arc::new(AtomicUsize::new(0));
            let mut debouncer = Debouncer::new(Duration::from_millis(WINDOW_MS));
            for gap in &gaps {
                let counter = Arc::clone(&fired);
                debouncer.reschedule(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
                tokio::time::sleep(Duration::from_millis(*gap)).await;
            }
            debouncer.cancel();
            tokio::time::sleep(Duration::from_millis(WINDOW_MS * 2)).await;
            fired.load(Ordering::SeqCst)
        });

        prop_assert_eq!(fired, 0);
    }
}
