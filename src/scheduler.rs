//! The interrupt-driven cycle engine.
//!
//! A [`Scheduler`] runs one refresh cycle across as many timer interrupts as it
//! needs. Each invocation either finishes the cycle, or arms the timer for the next
//! deadline and returns. Deadlines that are too close to be worth a timer round
//! trip are busy-waited inline instead (see [`wait_or_yield`]).

use embedded_hal::digital::PinState;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::OutputConfig;
use crate::hal::{Compensation, EscHal};
use crate::protocol::Topology;
use crate::slot::{ChannelBuffer, Slot, commit};

/// Outcome of [`wait_or_yield`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wait {
    /// The timer was armed; the handler must return and resume on the next interrupt.
    Yielded,
    /// The wait already elapsed inline; the handler continues.
    Completed,
}

/// Wait `ticks`, by arming the timer when that pays off, or by spinning otherwise.
///
/// Arming the timer and re-entering the handler costs about
/// `compensation.yield_threshold` ticks, so only longer waits yield. A yielded wait
/// is shortened by that cost and lengthened by `rearm_margin`.
pub fn wait_or_yield<H: EscHal>(hal: &mut H, ticks: u32, compensation: &Compensation) -> Wait {
    if ticks > compensation.yield_threshold {
        hal.arm_timer(
            ticks
                .saturating_sub(compensation.yield_threshold)
                .saturating_add(compensation.rearm_margin),
        );
        return Wait::Yielded;
    }
    spin_wait(hal, ticks, compensation);
    Wait::Completed
}

/// Poll the tick counter until `ticks` have elapsed.
///
/// Requests below `spin_floor` return at once: checking the counter would take
/// about as long as the wait itself.
pub fn spin_wait<H: EscHal>(hal: &mut H, ticks: u32, compensation: &Compensation) {
    if ticks < compensation.spin_floor {
        return;
    }
    let span = ticks.saturating_sub(compensation.spin_overhead);
    let start = hal.cycle_count();
    while hal.cycle_count().wrapping_sub(start) < span {
        core::hint::spin_loop();
    }
}

/// Cycle state owned by the interrupt context.
///
/// `cursor` is `None` between cycles. During a cycle it indexes the committed slot
/// the handler acts on next, or equals `N` once the table is exhausted.
/// `cycle_topology` is latched when a cycle starts and holds until it finishes.
pub struct Scheduler<H, const N: usize> {
    hal: H,
    slots: [Slot; N],
    cursor: Option<usize>,
    space: u32,
    interval: u32,
    config: OutputConfig,
    cycle_topology: Topology,
    compensation: Compensation,
}

impl<H: EscHal, const N: usize> Scheduler<H, N> {
    /// Take ownership of the hardware and apply the default configuration.
    #[must_use]
    pub fn new(hal: H) -> Self {
        let config = OutputConfig::default();
        Self {
            hal,
            slots: [Slot::OFF; N],
            cursor: None,
            space: 0,
            interval: H::us_to_ticks(config.interval_us()),
            cycle_topology: config.topology(),
            config,
            compensation: H::COMPENSATION,
        }
    }

    /// Adopt a new configuration.
    ///
    /// Protocol and interval apply from the next cycle start: a cycle in flight
    /// finishes in the topology it started with. The new mode decides whether the
    /// timer rearms once that cycle ends.
    pub fn configure(&mut self, config: OutputConfig) {
        self.interval = H::us_to_ticks(config.interval_us());
        self.config = config;
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Ticks per refresh cycle.
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// Idle ticks after the last pulse of the current (or last) cycle.
    #[must_use]
    pub const fn space(&self) -> u32 {
        self.space
    }

    /// Table the current (or last) cycle runs against.
    #[must_use]
    pub const fn slots(&self) -> &[Slot; N] {
        &self.slots
    }

    /// `true` while a cycle is in flight.
    #[must_use]
    pub const fn in_cycle(&self) -> bool {
        self.cursor.is_some()
    }

    /// The owned hardware backend.
    #[must_use]
    pub const fn hal(&self) -> &H {
        &self.hal
    }

    /// The owned hardware backend, mutably.
    pub const fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Arm the timer so the first free-running cycle starts one interval from now.
    pub fn arm_first_cycle(&mut self) {
        self.hal.arm_timer(self.interval);
    }

    /// Start a cycle in the configured topology, or continue the one in flight.
    pub fn handle(&mut self, buffer: &ChannelBuffer<N>, busy: &AtomicBool) {
        if !self.in_cycle() {
            self.cycle_topology = self.config.topology();
        }
        match self.cycle_topology {
            Topology::Concurrent => self.handle_concurrent(buffer, busy),
            Topology::Sequential => self.handle_sequential(buffer, busy),
        }
    }

    /// Timer interrupt entry.
    ///
    /// Same as [`handle`](Self::handle), except that between cycles in synchronized
    /// mode the alarm is stale (left over from free running) and starts nothing.
    pub fn on_timer(&mut self, buffer: &ChannelBuffer<N>, busy: &AtomicBool) {
        if !self.in_cycle() && !self.config.free_running() {
            return;
        }
        self.handle(buffer, busy);
    }

    /// Raise all pins together, then lower each as its width elapses.
    ///
    /// Slots whose falling edges are closer than the yield threshold are lowered in
    /// the same invocation, so a group of near-equal widths costs one interrupt.
    fn handle_concurrent(&mut self, buffer: &ChannelBuffer<N>, busy: &AtomicBool) {
        let mut index = match self.cursor {
            Some(index) => index,
            None => {
                busy.store(true, Ordering::Release);
                let committed = commit(buffer.snapshot(), self.interval);
                self.slots = committed.slots;
                self.space = committed.space;

                let first = self.raise_all();
                self.cursor = Some(first);
                // Every pin rose together, so the first falling edge is one full width away.
                if let Some(slot) = self.slots.get(first) {
                    if wait_or_yield(&mut self.hal, slot.pulse, &self.compensation)
                        == Wait::Yielded
                    {
                        return;
                    }
                }
                first
            }
        };

        while let Some(slot) = self.slots.get(index) {
            self.hal.set_pin(slot.pin, PinState::Low);
            index = index.saturating_add(1);
            self.cursor = Some(index);
            match self.slots.get(index) {
                Some(next) if next.is_active() => {
                    if wait_or_yield(&mut self.hal, next.diff, &self.compensation)
                        == Wait::Yielded
                    {
                        return;
                    }
                }
                // Inactive slots trail the table, so nothing after this is high.
                _ => break,
            }
        }

        self.finish_cycle(busy);
    }

    /// Pulse active channels one at a time, in channel order.
    fn handle_sequential(&mut self, buffer: &ChannelBuffer<N>, busy: &AtomicBool) {
        let mut index = match self.cursor {
            Some(index) => index,
            None => {
                busy.store(true, Ordering::Release);
                self.slots = buffer.snapshot();
                self.space = self
                    .slots
                    .iter()
                    .filter(|slot| slot.is_active())
                    .fold(self.interval, |space, slot| space.saturating_sub(slot.pulse));

                let first = self
                    .slots
                    .iter()
                    .position(Slot::is_active)
                    .unwrap_or(N);
                self.cursor = Some(first);
                if let Some(slot) = self.slots.get(first) {
                    self.hal.set_pin(slot.pin, PinState::High);
                    self.hal.arm_timer(
                        slot.pulse
                            .saturating_sub(self.compensation.sequential_first),
                    );
                    return;
                }
                first
            }
        };

        while let Some(slot) = self.slots.get(index) {
            if slot.is_active() {
                self.hal.set_pin(slot.pin, PinState::Low);
            }
            index = index.saturating_add(1);
            self.cursor = Some(index);
            if let Some(next) = self.slots.get(index).filter(|next| next.is_active()) {
                self.hal.set_pin(next.pin, PinState::High);
                self.hal
                    .arm_timer(next.pulse.saturating_sub(self.compensation.sequential_next));
                return;
            }
        }

        self.finish_cycle(busy);
    }

    /// Drive every active pin longer than a microsecond high. Returns the index of the
    /// first raised slot, or `N` when none was raised.
    fn raise_all(&mut self) -> usize {
        let mut first = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.is_active() || slot.pulse <= H::TICKS_PER_US {
                continue;
            }
            first.get_or_insert(index);
            self.hal.set_pin(slot.pin, PinState::High);
        }
        first.unwrap_or(N)
    }

    fn finish_cycle(&mut self, busy: &AtomicBool) {
        self.cursor = None;
        busy.store(false, Ordering::Release);
        if self.config.free_running() {
            self.hal.arm_timer(self.space);
        }
    }
}
