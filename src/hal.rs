//! Hardware primitives the pulse scheduler runs on.
//!
//! The scheduler never touches registers directly. It asks an [`EscHal`] to read a
//! free-running tick counter, drive pins, and arm a one-shot timer. Each backend also
//! carries its own [`Compensation`] constants, calibrated to how long that platform
//! takes to arm the timer and re-enter the interrupt handler.

/// Pin level, re-exported from `embedded-hal`.
pub use embedded_hal::digital::PinState;

#[cfg(feature = "host")]
pub mod mock;
#[cfg(any(feature = "pico1", feature = "pico2"))]
pub mod rp;

/// Tick constants that absorb timer and interrupt latency.
///
/// All values are in timer ticks of the backend that provides them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Compensation {
    /// Waits longer than this yield to the timer; shorter waits spin inline.
    ///
    /// Also subtracted from every yielded wait, since arming the timer and
    /// re-entering the handler costs about this much.
    pub yield_threshold: u32,
    /// Added back to a yielded wait so the handler never re-enters early.
    pub rearm_margin: u32,
    /// Spin requests shorter than this return immediately.
    pub spin_floor: u32,
    /// Subtracted from every spin to account for the polling loop itself.
    pub spin_overhead: u32,
    /// Subtracted from the first pulse of a sequential cycle (pays for the snapshot).
    pub sequential_first: u32,
    /// Subtracted from every following pulse of a sequential cycle.
    pub sequential_next: u32,
}

impl Compensation {
    /// No compensation at all. Useful for reasoning about ideal timing.
    pub const NONE: Self = Self {
        yield_threshold: 0,
        rearm_margin: 0,
        spin_floor: 0,
        spin_overhead: 0,
        sequential_first: 0,
        sequential_next: 0,
    };
}

/// Timer, tick counter, and GPIO access for one output stage.
///
/// Exactly one value implementing this trait exists per hardware timer; the driver
/// takes ownership of it.
pub trait EscHal {
    /// Timer ticks per microsecond.
    const TICKS_PER_US: u32;

    /// Latency calibration for this backend.
    const COMPENSATION: Compensation;

    /// Convert a width in microseconds to ticks.
    #[must_use]
    fn us_to_ticks(us: u32) -> u32 {
        us.saturating_mul(Self::TICKS_PER_US)
    }

    /// Read the free-running tick counter. Wraps.
    fn cycle_count(&mut self) -> u32;

    /// Configure `pin` as a push-pull output, driven low.
    fn configure_output(&mut self, pin: u8);

    /// Drive `pin` to `level`.
    fn set_pin(&mut self, pin: u8, level: PinState);

    /// Fire the timer interrupt once, `ticks` from now.
    fn arm_timer(&mut self, ticks: u32);

    /// Enable the one-shot timer and its interrupt. Called once per driver.
    fn install_timer_interrupt(&mut self);
}
