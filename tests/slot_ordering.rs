#![allow(missing_docs)]
//! Host-level tests for slot ordering and the per-cycle commit.

use esc_envoy::slot::{ChannelBuffer, NO_PIN, Slot, commit};

const INTERVAL: u32 = 16_000;

// Deterministic pseudo-random widths, a quarter of them zero.
struct Lcg(u64);

impl Lcg {
    fn next_pulse(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let raw = (self.0 >> 33) as u32;
        if raw % 4 == 0 { 0 } else { raw % INTERVAL }
    }

    fn slots<const N: usize>(&mut self) -> [Slot; N] {
        let mut pin = 0u8;
        [(); N].map(|()| {
            pin += 1;
            Slot::new(pin, self.next_pulse())
        })
    }
}

#[test]
fn active_slots_sort_before_inactive_ones() {
    let mut lcg = Lcg(7);
    for _ in 0..500 {
        let committed = commit(lcg.slots::<8>(), INTERVAL);
        let first_inactive = committed
            .slots
            .iter()
            .position(|slot| !slot.is_active())
            .unwrap_or(8);
        assert!(committed.slots[first_inactive..].iter().all(|slot| !slot.is_active()));
        assert!(
            committed.slots[..first_inactive]
                .windows(2)
                .all(|pair| pair[0].pulse <= pair[1].pulse)
        );
    }
}

#[test]
fn diffs_add_up_to_each_width() {
    let mut lcg = Lcg(42);
    for _ in 0..500 {
        let committed = commit(lcg.slots::<6>(), INTERVAL);
        let mut elapsed = 0;
        for slot in committed.slots.iter().filter(|slot| slot.is_active()) {
            elapsed += slot.diff;
            assert_eq!(elapsed, slot.pulse);
        }
        for slot in committed.slots.iter().filter(|slot| !slot.is_active()) {
            assert_eq!(slot.diff, 0);
        }
    }
}

#[test]
fn longest_width_plus_space_fills_the_interval() {
    let mut lcg = Lcg(1_234);
    for _ in 0..500 {
        let committed = commit(lcg.slots::<4>(), INTERVAL);
        let longest = committed
            .slots
            .iter()
            .map(|slot| slot.pulse)
            .max()
            .unwrap_or(0);
        assert_eq!(longest + committed.space, INTERVAL);
    }
}

#[test]
fn commit_sorts_and_spaces_mixed_widths() {
    let slots = [
        Slot::new(0, 4_000),
        Slot::new(1, 0),
        Slot::new(2, 6_000),
        Slot::new(3, 4_000),
    ];
    let committed = commit(slots, INTERVAL);

    let pulses = committed.slots.map(|slot| slot.pulse);
    let diffs = committed.slots.map(|slot| slot.diff);
    assert_eq!(pulses, [4_000, 4_000, 6_000, 0]);
    assert_eq!(diffs, [4_000, 0, 2_000, 0]);
    assert_eq!(committed.slots[2].pin, 2);
    assert_eq!(committed.slots[3].pin, 1);
    assert_eq!(committed.space, 10_000);
}

#[test]
fn commit_with_nothing_active_idles_the_whole_interval() {
    let committed = commit([Slot::OFF; 3], INTERVAL);
    assert!(committed.slots.iter().all(|slot| !slot.is_active()));
    assert_eq!(committed.space, INTERVAL);
}

#[test]
fn width_longer_than_interval_leaves_no_space() {
    let committed = commit([Slot::new(0, INTERVAL + 500)], INTERVAL);
    assert_eq!(committed.space, 0);
}

#[test]
fn inactive_slots_compare_equal_regardless_of_pin() {
    assert_eq!(Slot::new(3, 0), Slot::new(9, 0));
    assert!(Slot::new(0, 1) < Slot::new(0, 0));
    assert!(Slot::new(0, 16_000) < Slot::OFF);
    assert!(Slot::new(5, 100) < Slot::new(1, 200));
}

#[test]
fn snapshot_reads_unattached_channels_as_inactive() {
    let buffer = ChannelBuffer::<3>::new();
    assert!(buffer.attach(0, 4, 1_000));
    // Written but never attached: no pin to drive.
    assert!(buffer.write(2, 2_000));

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot[0].pin, 4);
    assert_eq!(snapshot[0].pulse, 1_000);
    assert!(!snapshot[1].is_active());
    assert!(!snapshot[2].is_active());
    assert_eq!(snapshot[2].pin, NO_PIN);
}

#[test]
fn buffer_rejects_out_of_range_channels() {
    let buffer = ChannelBuffer::<2>::new();
    assert!(!buffer.attach(2, 0, 1_000));
    assert!(!buffer.write(5, 1_000));
    assert!(buffer.snapshot().iter().all(|slot| !slot.is_active()));
    assert_eq!(buffer.len(), 2);
}
