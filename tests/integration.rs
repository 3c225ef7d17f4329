//! End-to-end scenario over the mock counter
//!
//! Drives the full stack — initialization, self-test, scheduling, dispatch,
//! diagnostics — the way a board port would, with simulated time advanced
//! in large steps and events delivered through `poll()`.

use core::cell::RefCell;

use critical_section::Mutex;

use pico_hrt::core::hrt::{Hrt, HrtConfig};
use pico_hrt::platform::mock::MockCounter;

static FIRED: Mutex<RefCell<heapless::Vec<usize, 8>>> =
    Mutex::new(RefCell::new(heapless::Vec::new()));

fn record(arg: usize) {
    critical_section::with(|cs| FIRED.borrow_ref_mut(cs).push(arg).unwrap());
}

#[test]
fn end_to_end_dispatch_scenario() {
    // 1 MHz tick rate: ticks and microseconds are identical
    let hrt = Hrt::new(MockCounter::new(1_000_000, 32), HrtConfig::default());

    hrt.initialize();
    assert!(hrt.is_ready());
    assert!(hrt.self_test_passed());
    assert!(hrt.config_valid());

    let a = hrt.callout_alloc().unwrap();
    let b = hrt.callout_alloc().unwrap();
    let c = hrt.callout_alloc().unwrap();

    let base = hrt.absolute_time();
    hrt.schedule_at(&a, base + 100, Some(record), 100);
    hrt.schedule_at(&b, base + 50, Some(record), 50);
    hrt.schedule_at(&c, base + 200, Some(record), 200);
    assert_eq!(hrt.pending_callouts(), 3);

    // Step past every deadline in one go; a single interrupt drains all
    // three in deadline order.
    hrt.with_counter(|counter| counter.advance_us(250));
    hrt.poll();

    let order = critical_section::with(|cs| FIRED.borrow_ref(cs).clone());
    assert_eq!(order.as_slice(), &[50, 100, 200]);
    assert_eq!(hrt.pending_callouts(), 0);

    assert!(hrt.is_fired(&a));
    assert!(hrt.is_fired(&b));
    assert!(hrt.is_fired(&c));

    // Self-test plus the dispatch firing are visible in the histogram
    let counts = hrt.latency_counts();
    assert_eq!(counts.iter().sum::<u32>(), 2);
    assert_eq!(hrt.latency_buckets().len(), counts.len() - 1);

    hrt.callout_release(a);
    hrt.callout_release(b);
    hrt.callout_release(c);
}
