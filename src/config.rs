//! Output configuration consumed by [`EscDriver::begin`](crate::driver::EscDriver::begin).

use crate::protocol::{EscProtocol, Topology};

/// Lowest accepted refresh rate (Hz).
pub const RATE_MIN_HZ: u16 = 50;

/// Highest accepted refresh rate (Hz).
pub const RATE_MAX_HZ: u16 = 4_000;

/// Default refresh rate (Hz), the classic servo frame.
pub const RATE_DEFAULT_HZ: u16 = 50;

const MICROS_PER_SECOND: u32 = 1_000_000;

/// Normalized output configuration.
///
/// Build with [`OutputConfig::new`], which clamps the rate into
/// [`RATE_MIN_HZ`]..=[`RATE_MAX_HZ`] and forces free running for protocols that
/// cannot be synchronized to the control loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputConfig {
    protocol: EscProtocol,
    free_running: bool,
    rate_hz: u16,
}

impl OutputConfig {
    /// Create a normalized configuration.
    #[must_use]
    pub const fn new(protocol: EscProtocol, free_running: bool, rate_hz: u16) -> Self {
        let rate_hz = if rate_hz < RATE_MIN_HZ {
            RATE_MIN_HZ
        } else if rate_hz > RATE_MAX_HZ {
            RATE_MAX_HZ
        } else {
            rate_hz
        };
        Self {
            protocol,
            free_running: free_running || protocol.requires_free_running(),
            rate_hz,
        }
    }

    /// Selected protocol.
    #[must_use]
    pub const fn protocol(&self) -> EscProtocol {
        self.protocol
    }

    /// Cycle layout of the selected protocol.
    #[must_use]
    pub const fn topology(&self) -> Topology {
        self.protocol.topology()
    }

    /// `true` when the timer triggers every cycle, `false` when `apply` does.
    #[must_use]
    pub const fn free_running(&self) -> bool {
        self.free_running
    }

    /// Refresh rate after clamping (Hz).
    #[must_use]
    pub const fn rate_hz(&self) -> u16 {
        self.rate_hz
    }

    /// Length of one refresh cycle in microseconds.
    #[must_use]
    pub const fn interval_us(&self) -> u32 {
        // rate_hz >= RATE_MIN_HZ, never zero
        match MICROS_PER_SECOND.checked_div(self.rate_hz as u32) {
            Some(interval_us) => interval_us,
            None => MICROS_PER_SECOND,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(EscProtocol::Pwm, true, RATE_DEFAULT_HZ)
    }
}
