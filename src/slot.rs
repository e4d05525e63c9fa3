//! Channel slots, the foreground write buffer, and the per-cycle commit step.
//!
//! The foreground control loop writes into a [`ChannelBuffer`] at any time. Once per
//! cycle the scheduler snapshots that buffer and [`commit`]s it into a sorted table
//! that stays fixed until the cycle ends, so a write landing mid-cycle can never
//! produce a half-old, half-new waveform.

use core::cmp::Ordering;

use portable_atomic::{AtomicU8, AtomicU32, Ordering as AtomicOrdering};

/// Pin identifier stored for channels that were never attached.
pub const NO_PIN: u8 = u8::MAX;

/// One output channel: its pin, commanded width, and gap from the previous slot.
///
/// Slots order by ascending `pulse`, with every inactive slot sorting after every
/// active one. `pin` and `diff` do not take part in comparisons.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot {
    /// GPIO line this channel drives.
    pub pin: u8,
    /// Commanded pulse width in timer ticks. Zero means off.
    pub pulse: u32,
    /// Ticks from the previous slot's falling edge to this slot's falling edge.
    ///
    /// Only meaningful in a committed table of the concurrent topology.
    pub diff: u32,
}

impl Slot {
    /// An inactive slot on no pin.
    pub const OFF: Self = Self::new(NO_PIN, 0);

    /// Create a slot with no computed gap.
    #[must_use]
    pub const fn new(pin: u8, pulse: u32) -> Self {
        Self {
            pin,
            pulse,
            diff: 0,
        }
    }

    /// `true` when this slot emits a pulse this cycle.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.pulse > 0
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::OFF
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_active(), other.is_active()) {
            (true, true) => self.pulse.cmp(&other.pulse),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

/// A committed cycle: sorted slots plus the idle time after the last falling edge.
#[derive(Clone, Copy, Debug)]
pub struct Committed<const N: usize> {
    /// Slots sorted by [`Slot`] ordering, `diff` filled for the active prefix.
    pub slots: [Slot; N],
    /// Ticks from the longest pulse's falling edge to the end of the cycle.
    pub space: u32,
}

/// Sort a buffer snapshot and compute the falling-edge gaps for the concurrent topology.
///
/// The first active slot's `diff` is its own width (all pins rise at cycle start);
/// each following active slot's `diff` is the width difference to its predecessor.
/// Inactive slots trail and keep `diff == 0`. `space` is `interval` minus the longest
/// active width, or the whole `interval` when nothing is active.
#[must_use]
pub fn commit<const N: usize>(mut slots: [Slot; N], interval: u32) -> Committed<N> {
    slots.sort_unstable();

    let mut longest: Option<u32> = None;
    for slot in slots.iter_mut() {
        if !slot.is_active() {
            slot.diff = 0;
            continue;
        }
        slot.diff = longest.map_or(slot.pulse, |previous| slot.pulse.saturating_sub(previous));
        longest = Some(slot.pulse);
    }

    Committed {
        slots,
        space: longest.map_or(interval, |pulse| interval.saturating_sub(pulse)),
    }
}

/// Foreground-side channel table.
///
/// Every field is its own atomic so the control loop can update widths without a
/// lock while the interrupt copies the table. A snapshot that interleaves with a
/// write may see one channel's old pin with its new width; that glitch lasts at
/// most one cycle.
pub struct ChannelBuffer<const N: usize> {
    pins: [AtomicU8; N],
    pulses: [AtomicU32; N],
}

impl<const N: usize> ChannelBuffer<N> {
    /// Create an empty buffer: no pins attached, all widths zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pins: [const { AtomicU8::new(NO_PIN) }; N],
            pulses: [const { AtomicU32::new(0) }; N],
        }
    }

    /// Number of channels.
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    /// `true` for a zero-channel buffer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Assign a pin and width. Returns `false` when `channel` is out of range.
    pub fn attach(&self, channel: usize, pin: u8, pulse: u32) -> bool {
        let (Some(pin_cell), Some(pulse_cell)) = (self.pins.get(channel), self.pulses.get(channel))
        else {
            return false;
        };
        pulse_cell.store(pulse, AtomicOrdering::Relaxed);
        pin_cell.store(pin, AtomicOrdering::Release);
        true
    }

    /// Update a width. Returns `false` when `channel` is out of range.
    pub fn write(&self, channel: usize, pulse: u32) -> bool {
        let Some(pulse_cell) = self.pulses.get(channel) else {
            return false;
        };
        pulse_cell.store(pulse, AtomicOrdering::Relaxed);
        true
    }

    /// Copy the table in channel order. Unattached channels read as inactive.
    #[must_use]
    pub fn snapshot(&self) -> [Slot; N] {
        let mut slots = [Slot::OFF; N];
        for ((slot, pin), pulse) in slots.iter_mut().zip(&self.pins).zip(&self.pulses) {
            let pin = pin.load(AtomicOrdering::Acquire);
            if pin != NO_PIN {
                *slot = Slot::new(pin, pulse.load(AtomicOrdering::Relaxed));
            }
        }
        slots
    }
}

impl<const N: usize> Default for ChannelBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
