//! A device abstraction for a multi-channel ESC output stage.
//!
//! This page provides the primary documentation for driving ESCs and servos from one
//! hardware timer. See [`EscDriver`] for the full example.
//!
//! # Modes
//!
//! - **Free running**: the timer starts every cycle by itself, one interval after the
//!   previous one began. Widths written with [`EscDriver::write`] are picked up at the
//!   next cycle start.
//! - **Synchronized**: each cycle starts when the control loop calls
//!   [`EscDriver::apply`], so outputs follow the loop with no added latency.
//!
//! In both modes the width table is snapshotted once per cycle; writes made while a
//! cycle is in flight only show up in the next one.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::OutputConfig;
use crate::hal::EscHal;
use crate::protocol::EscProtocol;
use crate::scheduler::Scheduler;
use crate::slot::{ChannelBuffer, Slot};
use crate::{Error, Result};

/// Static resources for [`EscDriver`].
///
/// Holds the foreground write buffer, the busy flag the interrupt publishes, and the
/// scheduler (with the hardware it owns) behind a critical-section mutex. The timer
/// interrupt vector calls [`on_timer_interrupt`](Self::on_timer_interrupt) on this
/// value.
pub struct EscDriverStatic<H, const N: usize> {
    buffer: ChannelBuffer<N>,
    busy: AtomicBool,
    free_running: AtomicBool,
    installed: AtomicBool,
    scheduler: Mutex<CriticalSectionRawMutex, RefCell<Option<Scheduler<H, N>>>>,
}

impl<H: EscHal, const N: usize> EscDriverStatic<H, N> {
    /// Create static resources for an ESC driver.
    #[must_use]
    pub const fn new_static() -> Self {
        Self {
            buffer: ChannelBuffer::new(),
            busy: AtomicBool::new(false),
            free_running: AtomicBool::new(true),
            installed: AtomicBool::new(false),
            scheduler: Mutex::new(RefCell::new(None)),
        }
    }

    /// Timer interrupt entry. Call this, and only this, from the timer's vector.
    ///
    /// Does nothing until an [`EscDriver`] was created on this static.
    pub fn on_timer_interrupt(&self) {
        let _ = self.with_scheduler(|scheduler| scheduler.on_timer(&self.buffer, &self.busy));
    }

    fn with_scheduler<R>(&self, f: impl FnOnce(&mut Scheduler<H, N>) -> R) -> Result<R> {
        self.scheduler.lock(|cell| {
            let mut scheduler = cell.borrow_mut();
            scheduler.as_mut().map(f).ok_or(Error::NotInitialized)
        })
    }
}

impl<H: EscHal, const N: usize> Default for EscDriverStatic<H, N> {
    fn default() -> Self {
        Self::new_static()
    }
}

/// A device abstraction for `N` ESC (or servo) outputs driven from one hardware timer.
///
/// The driver owns the hardware backend `H` for its whole life. One timer, one driver:
/// [`begin`](Self::begin) installs the interrupt on its first call only, later calls
/// just reconfigure.
///
/// # Example
///
/// ```rust,ignore
/// # #![no_std]
/// # #![no_main]
/// # use panic_probe as _;
/// use esc_envoy::{Result, hal::rp::RpEscHal, driver::{EscDriver, EscDriverStatic}};
/// use esc_envoy::protocol::EscProtocol;
///
/// static ESC_STATIC: EscDriverStatic<RpEscHal<4>, 4> = EscDriver::new_static();
///
/// fn example(hal: RpEscHal<4>) -> Result<()> {
///     let esc = EscDriver::new(&ESC_STATIC, hal)?;
///     for channel in 0..4 {
///         esc.attach(channel, channel as u8, 1_000)?;
///     }
///     // Synchronized OneShot125 at 2 kHz: one cycle per control loop iteration.
///     esc.begin(EscProtocol::Oneshot125, false, 2_000)?;
///
///     loop {
///         esc.write(0, 180)?;
///         esc.apply();
///     }
/// }
/// ```
pub struct EscDriver<'a, H, const N: usize> {
    esc_static: &'a EscDriverStatic<H, N>,
}

impl<H, const N: usize> Clone for EscDriver<'_, H, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, const N: usize> Copy for EscDriver<'_, H, N> {}

impl<'a, H: EscHal, const N: usize> EscDriver<'a, H, N> {
    /// Number of output channels.
    pub const CHANNEL_COUNT: usize = N;

    /// Create static resources for an ESC driver.
    #[must_use]
    pub const fn new_static() -> EscDriverStatic<H, N> {
        EscDriverStatic::new_static()
    }

    /// Hand the hardware backend to the driver.
    ///
    /// All channels start unattached and off. Nothing is emitted until
    /// [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if `esc_static` already owns a backend.
    pub fn new(esc_static: &'a EscDriverStatic<H, N>, hal: H) -> Result<Self> {
        esc_static.scheduler.lock(|cell| {
            let mut scheduler = cell.borrow_mut();
            if scheduler.is_some() {
                return Err(Error::AlreadyInitialized);
            }
            *scheduler = Some(Scheduler::new(hal));
            Ok(())
        })?;
        Ok(Self { esc_static })
    }

    /// Bind `channel` to `pin`, configure the pin as an output, and set its width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelOutOfRange`] if `channel >= N`. Nothing changes then.
    pub fn attach(&self, channel: usize, pin: u8, pulse_us: u16) -> Result<()> {
        self.check_channel(channel)?;
        self.esc_static
            .with_scheduler(|scheduler| scheduler.hal_mut().configure_output(pin))?;
        self.esc_static
            .buffer
            .attach(channel, pin, H::us_to_ticks(u32::from(pulse_us)));
        #[cfg(feature = "defmt")]
        defmt::info!("esc attach: channel {} -> pin {}, {}µs", channel, pin, pulse_us);
        Ok(())
    }

    /// Set the width of `channel`. Takes effect at the next cycle start.
    ///
    /// Zero switches the channel off: its pin is not touched at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelOutOfRange`] if `channel >= N`. Nothing changes then.
    pub fn write(&self, channel: usize, pulse_us: u16) -> Result<()> {
        self.check_channel(channel)?;
        self.esc_static
            .buffer
            .write(channel, H::us_to_ticks(u32::from(pulse_us)));
        Ok(())
    }

    /// Start one cycle now, in the caller's context (synchronized mode only).
    ///
    /// Does nothing in free-running mode, or while a cycle is still in flight.
    pub fn apply(&self) {
        if self.esc_static.free_running.load(Ordering::Acquire)
            || self.esc_static.busy.load(Ordering::Acquire)
        {
            return;
        }
        let _ = self.esc_static.with_scheduler(|scheduler| {
            if !scheduler.in_cycle() {
                scheduler.handle(&self.esc_static.buffer, &self.esc_static.busy);
            }
        });
    }

    /// Select protocol, mode, and refresh rate; install the timer interrupt once.
    ///
    /// `rate_hz` is clamped to 50..=4000. Protocols that cannot follow the control
    /// loop (brushed) run free regardless of `free_running`. In free-running mode the
    /// first cycle is armed one interval from now.
    ///
    /// A cycle already in flight finishes unchanged; the new protocol and rate take
    /// over from the next cycle. Switching to synchronized mode leaves any pending
    /// free-running alarm to expire without starting a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] only if the static lost its backend, which
    /// the public constructors never allow.
    pub fn begin(&self, protocol: EscProtocol, free_running: bool, rate_hz: u16) -> Result<()> {
        let config = OutputConfig::new(protocol, free_running, rate_hz);
        self.esc_static.with_scheduler(|scheduler| {
            let first_install = !self.esc_static.installed.swap(true, Ordering::AcqRel);
            let was_free_running = self
                .esc_static
                .free_running
                .swap(config.free_running(), Ordering::AcqRel);
            scheduler.configure(config);
            if first_install {
                scheduler.hal_mut().install_timer_interrupt();
            }
            // A free-running timer is already armed unless we just installed it or the
            // previous configuration left it to `apply`.
            if config.free_running()
                && (first_install || !was_free_running)
                && !scheduler.in_cycle()
            {
                scheduler.arm_first_cycle();
            }
        })?;
        #[cfg(feature = "defmt")]
        defmt::info!(
            "esc begin: {} at {}Hz, free_running={}",
            config.protocol(),
            config.rate_hz(),
            config.free_running()
        );
        Ok(())
    }

    /// `true` while a cycle is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.esc_static.busy.load(Ordering::Acquire)
    }

    /// Active configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] only if the static lost its backend.
    pub fn config(&self) -> Result<OutputConfig> {
        self.esc_static.with_scheduler(|scheduler| *scheduler.config())
    }

    /// Ticks per refresh cycle under the active configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] only if the static lost its backend.
    pub fn interval_ticks(&self) -> Result<u32> {
        self.esc_static.with_scheduler(|scheduler| scheduler.interval())
    }

    /// Table the current (or most recent) cycle runs against, and its idle space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] only if the static lost its backend.
    pub fn committed(&self) -> Result<([Slot; N], u32)> {
        self.esc_static
            .with_scheduler(|scheduler| (*scheduler.slots(), scheduler.space()))
    }

    /// Run `f` with the hardware backend, inside the driver's critical section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] only if the static lost its backend.
    pub fn with_hal<R>(&self, f: impl FnOnce(&mut H) -> R) -> Result<R> {
        self.esc_static
            .with_scheduler(|scheduler| f(scheduler.hal_mut()))
    }

    /// Same as [`EscDriverStatic::on_timer_interrupt`].
    pub fn on_timer_interrupt(&self) {
        self.esc_static.on_timer_interrupt();
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        if channel < N {
            Ok(())
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!("esc: channel {} out of range ({} channels)", channel, N);
            Err(Error::ChannelOutOfRange { channel, count: N })
        }
    }
}
