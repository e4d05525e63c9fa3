//! Backend for the Raspberry Pi Pico 1 (RP2040) and Pico 2 (RP2350).
//!
//! Uses the 1 MHz system timer: its raw low word is the tick counter and alarm 1 is
//! the one-shot timer (alarm 0 belongs to `embassy-time`). Pins are whatever
//! [`Output`]s you hand over; the pin identifier passed to
//! [`EscDriver::attach`](crate::driver::EscDriver::attach) is the index into that
//! array.
//!
//! The application binds the alarm's vector and forwards it:
//!
//! ```rust,ignore
//! use embassy_rp::interrupt;
//!
//! #[interrupt]
//! fn TIMER_IRQ_1() {
//!     RpEscHal::<4>::acknowledge_timer_interrupt();
//!     ESC_STATIC.on_timer_interrupt();
//! }
//! ```

use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt::InterruptExt;
use embedded_hal::digital::PinState;

#[cfg(feature = "pico1")]
use embassy_rp::interrupt::TIMER_IRQ_1 as ESC_TIMER_IRQ;
#[cfg(feature = "pico2")]
use embassy_rp::interrupt::TIMER0_IRQ_1 as ESC_TIMER_IRQ;
#[cfg(feature = "pico1")]
use embassy_rp::pac::TIMER;
#[cfg(feature = "pico2")]
use embassy_rp::pac::TIMER0 as TIMER;

use super::{Compensation, EscHal};

// Alarm 0 drives embassy-time.
const ALARM: usize = 1;

// An alarm target already in the past only fires after the 32-bit counter wraps
// (~71 minutes), so never aim closer than this.
const MIN_ALARM_TICKS: u32 = 2;

/// Timer and GPIO backend for Pico boards, driving `P` output pins.
pub struct RpEscHal<const P: usize> {
    outputs: [Output<'static>; P],
}

impl<const P: usize> RpEscHal<P> {
    /// Take ownership of the output pins. Pin identifier `i` drives `outputs[i]`.
    #[must_use]
    pub const fn new(outputs: [Output<'static>; P]) -> Self {
        Self { outputs }
    }

    /// Clear the alarm flag. Call first thing in the alarm's interrupt vector.
    pub fn acknowledge_timer_interrupt() {
        TIMER.intr().write(|w| w.set_alarm(ALARM, true));
    }

    fn output(&mut self, pin: u8) -> Option<&mut Output<'static>> {
        self.outputs.get_mut(usize::from(pin))
    }
}

impl<const P: usize> EscHal for RpEscHal<P> {
    const TICKS_PER_US: u32 = 1;

    // Tuned for a 125 MHz system clock, where arming plus vector entry plus the mutex
    // costs about 4 µs.
    const COMPENSATION: Compensation = Compensation {
        yield_threshold: 5,
        rearm_margin: 1,
        spin_floor: 2,
        spin_overhead: 1,
        sequential_first: 4,
        sequential_next: 3,
    };

    fn cycle_count(&mut self) -> u32 {
        TIMER.timerawl().read()
    }

    fn configure_output(&mut self, pin: u8) {
        if let Some(output) = self.output(pin) {
            output.set_low();
        }
    }

    fn set_pin(&mut self, pin: u8, level: PinState) {
        let level = match level {
            PinState::High => Level::High,
            PinState::Low => Level::Low,
        };
        if let Some(output) = self.output(pin) {
            output.set_level(level);
        }
    }

    fn arm_timer(&mut self, ticks: u32) {
        let target = TIMER
            .timerawl()
            .read()
            .wrapping_add(ticks.max(MIN_ALARM_TICKS));
        TIMER.alarm(ALARM).write_value(target);
    }

    #[expect(unsafe_code, reason = "enabling an NVIC line whose handler is bound by the app")]
    fn install_timer_interrupt(&mut self) {
        TIMER.inte().modify(|w| w.set_alarm(ALARM, true));
        ESC_TIMER_IRQ.unpend();
        // SAFETY: the application binds this vector to `on_timer_interrupt`, which only
        // touches state behind the driver's critical-section mutex.
        unsafe { ESC_TIMER_IRQ.enable() };
    }
}
