//! Simulated backend for host tests.
//!
//! [`MockHal`] keeps a virtual tick counter and records every pin transition and
//! timer request with the tick at which it happened. Time only moves when the
//! scheduler polls the counter (one tick per read) or when a test fires the armed
//! timer with [`MockHal::fire_timer`].

use std::vec::Vec;

use embedded_hal::digital::PinState;

use super::{Compensation, EscHal};

/// Ticks between the timer expiring and the handler's first instruction.
///
/// Equal to the mock's `yield_threshold`, so a yielded wait lands exactly on time.
pub const INTERRUPT_LATENCY: u32 = 100;

/// Highest pin number the mock tracks levels for.
pub const PIN_COUNT: usize = 32;

/// Something the scheduler asked the mock hardware to do.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MockEvent {
    /// A pin was driven.
    Pin {
        /// Tick of the transition.
        at: u32,
        /// Pin driven.
        pin: u8,
        /// New level.
        level: PinState,
    },
    /// The one-shot timer was armed.
    Arm {
        /// Tick of the request.
        at: u32,
        /// Requested delay.
        ticks: u32,
    },
}

/// Recording backend with a virtual clock.
#[derive(Debug)]
pub struct MockHal {
    now: u32,
    armed: Option<u32>,
    installs: usize,
    outputs: [bool; PIN_COUNT],
    levels: [PinState; PIN_COUNT],
    events: Vec<MockEvent>,
}

impl MockHal {
    /// Create a mock at tick zero with no pins configured.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: 0,
            armed: None,
            installs: 0,
            outputs: [false; PIN_COUNT],
            levels: [PinState::Low; PIN_COUNT],
            events: Vec::new(),
        }
    }

    /// Current virtual tick.
    #[must_use]
    pub const fn now(&self) -> u32 {
        self.now
    }

    /// Move the virtual clock forward, as if the foreground spent `ticks` elsewhere.
    pub fn advance(&mut self, ticks: u32) {
        self.now = self.now.wrapping_add(ticks);
    }

    /// Pending timer request, if any.
    #[must_use]
    pub const fn armed(&self) -> Option<u32> {
        self.armed
    }

    /// Expire the pending timer: advance the clock past it plus interrupt latency.
    ///
    /// Returns `false` when nothing was armed. The caller then invokes the
    /// driver's interrupt entry, as the vector would.
    pub fn fire_timer(&mut self) -> bool {
        match self.armed.take() {
            Some(ticks) => {
                self.advance(ticks.wrapping_add(INTERRUPT_LATENCY));
                true
            }
            None => false,
        }
    }

    /// How many times the interrupt was installed.
    #[must_use]
    pub const fn install_count(&self) -> usize {
        self.installs
    }

    /// `true` once `pin` was configured as an output.
    #[must_use]
    pub fn is_output(&self, pin: u8) -> bool {
        self.outputs.get(usize::from(pin)).copied().unwrap_or(false)
    }

    /// Last level driven on `pin`.
    #[must_use]
    pub fn level(&self, pin: u8) -> PinState {
        self.levels
            .get(usize::from(pin))
            .copied()
            .unwrap_or(PinState::Low)
    }

    /// Everything recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    /// Only the pin transitions, as `(tick, pin, level)`.
    #[must_use]
    pub fn pin_events(&self) -> Vec<(u32, u8, PinState)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                MockEvent::Pin { at, pin, level } => Some((at, pin, level)),
                MockEvent::Arm { .. } => None,
            })
            .collect()
    }

    /// Only the timer requests, as `(tick, ticks)`.
    #[must_use]
    pub fn arm_events(&self) -> Vec<(u32, u32)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                MockEvent::Arm { at, ticks } => Some((at, ticks)),
                MockEvent::Pin { .. } => None,
            })
            .collect()
    }

    /// Forget recorded events, keeping clock, levels and any pending timer.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl EscHal for MockHal {
    const TICKS_PER_US: u32 = 8;

    const COMPENSATION: Compensation = Compensation {
        yield_threshold: INTERRUPT_LATENCY,
        rearm_margin: 0,
        spin_floor: 4,
        spin_overhead: 0,
        sequential_first: INTERRUPT_LATENCY,
        sequential_next: INTERRUPT_LATENCY,
    };

    fn cycle_count(&mut self) -> u32 {
        let now = self.now;
        self.advance(1);
        now
    }

    fn configure_output(&mut self, pin: u8) {
        if let Some(output) = self.outputs.get_mut(usize::from(pin)) {
            *output = true;
        }
        if let Some(level) = self.levels.get_mut(usize::from(pin)) {
            *level = PinState::Low;
        }
    }

    fn set_pin(&mut self, pin: u8, level: PinState) {
        if let Some(current) = self.levels.get_mut(usize::from(pin)) {
            *current = level;
        }
        self.events.push(MockEvent::Pin {
            at: self.now,
            pin,
            level,
        });
    }

    fn arm_timer(&mut self, ticks: u32) {
        self.armed = Some(ticks);
        self.events.push(MockEvent::Arm {
            at: self.now,
            ticks,
        });
    }

    fn install_timer_interrupt(&mut self) {
        self.installs = self.installs.saturating_add(1);
    }
}
