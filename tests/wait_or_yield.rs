#![allow(missing_docs)]
//! Host-level tests for the wait-or-yield primitive.

use esc_envoy::hal::mock::MockHal;
use esc_envoy::hal::{Compensation, EscHal};
use esc_envoy::scheduler::{Wait, spin_wait, wait_or_yield};

const COMPENSATION: Compensation = MockHal::COMPENSATION;

#[test]
fn long_wait_arms_the_timer_and_yields() {
    let mut hal = MockHal::new();
    let outcome = wait_or_yield(&mut hal, 2_000, &COMPENSATION);

    assert_eq!(outcome, Wait::Yielded);
    assert_eq!(hal.armed(), Some(2_000 - COMPENSATION.yield_threshold));
    assert_eq!(hal.now(), 0, "yielding must not spin");
}

#[test]
fn yielded_wait_lands_on_time_after_interrupt_latency() {
    let mut hal = MockHal::new();
    hal.advance(500);
    assert_eq!(wait_or_yield(&mut hal, 1_234, &COMPENSATION), Wait::Yielded);
    assert!(hal.fire_timer());
    assert_eq!(hal.now(), 500 + 1_234);
}

#[test]
fn short_wait_spins_inline() {
    let mut hal = MockHal::new();
    let outcome = wait_or_yield(&mut hal, 60, &COMPENSATION);

    assert_eq!(outcome, Wait::Completed);
    assert_eq!(hal.armed(), None);
    assert!(hal.arm_events().is_empty());
    assert!((60..=62).contains(&hal.now()), "spun {} ticks", hal.now());
}

#[test]
fn wait_equal_to_threshold_spins() {
    let mut hal = MockHal::new();
    let outcome = wait_or_yield(&mut hal, COMPENSATION.yield_threshold, &COMPENSATION);

    assert_eq!(outcome, Wait::Completed);
    assert_eq!(hal.armed(), None);
    assert!(hal.now() >= COMPENSATION.yield_threshold);
}

#[test]
fn wait_just_above_threshold_yields_a_tiny_alarm() {
    let mut hal = MockHal::new();
    let outcome = wait_or_yield(&mut hal, COMPENSATION.yield_threshold + 1, &COMPENSATION);

    assert_eq!(outcome, Wait::Yielded);
    assert_eq!(hal.armed(), Some(1));
}

#[test]
fn zero_wait_returns_without_reading_the_counter() {
    let mut hal = MockHal::new();
    assert_eq!(wait_or_yield(&mut hal, 0, &COMPENSATION), Wait::Completed);
    assert_eq!(hal.now(), 0);
}

#[test]
fn spin_below_floor_returns_immediately() {
    let mut hal = MockHal::new();
    spin_wait(&mut hal, COMPENSATION.spin_floor - 1, &COMPENSATION);
    assert_eq!(hal.now(), 0);
}

#[test]
fn spin_overhead_shortens_the_spin() {
    let compensation = Compensation {
        spin_overhead: 10,
        ..COMPENSATION
    };
    let mut hal = MockHal::new();
    spin_wait(&mut hal, 50, &compensation);
    assert!((40..=42).contains(&hal.now()), "spun {} ticks", hal.now());
}

#[test]
fn rearm_margin_lengthens_yielded_waits() {
    let compensation = Compensation {
        rearm_margin: 3,
        ..COMPENSATION
    };
    let mut hal = MockHal::new();
    assert_eq!(wait_or_yield(&mut hal, 1_000, &compensation), Wait::Yielded);
    assert_eq!(hal.armed(), Some(1_000 - COMPENSATION.yield_threshold + 3));
}

#[test]
fn spin_survives_counter_wraparound() {
    let mut hal = MockHal::new();
    hal.advance(u32::MAX - 10);
    spin_wait(&mut hal, 40, &COMPENSATION);
    let elapsed = hal.now().wrapping_sub(u32::MAX - 10);
    assert!((40..=42).contains(&elapsed), "spun {elapsed} ticks");
}

#[test]
fn ideal_compensation_yields_every_nonzero_wait() {
    let mut hal = MockHal::new();
    assert_eq!(wait_or_yield(&mut hal, 1, &Compensation::NONE), Wait::Yielded);
    assert_eq!(hal.armed(), Some(1));
}
