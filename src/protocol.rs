//! ESC output protocols and the pulse topology each one uses.
//!
//! See [`EscProtocol`] for the list and [`Topology`] for how a protocol's cycle is laid out.

/// ESC output protocol selector.
///
/// The analog protocols differ only in pulse width range and achievable refresh rate,
/// which are decided by the caller. The digital protocols are listed so configuration
/// records can name them, but this crate emits no bit framing for them; they run
/// through the same cycle engine as placeholders.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EscProtocol {
    /// Standard servo-style PWM (1000..2000 µs).
    #[default]
    Pwm = 0,
    /// OneShot125 (125..250 µs).
    Oneshot125 = 1,
    /// OneShot42 (42..84 µs).
    Oneshot42 = 2,
    /// Multishot (5..25 µs), pulsed one channel at a time.
    Multishot = 3,
    /// Brushed motor PWM driven directly from the duty cycle.
    Brushed = 4,
    /// DShot150 placeholder.
    Dshot150 = 5,
    /// DShot300 placeholder.
    Dshot300 = 6,
    /// DShot600 placeholder.
    Dshot600 = 7,
    /// DShot1200 placeholder.
    Dshot1200 = 8,
    /// ProShot placeholder.
    Proshot = 9,
}

/// How the pulses of one refresh cycle are arranged in time.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topology {
    /// All active pins rise together and fall individually as their widths elapse.
    Concurrent,
    /// Active pins are pulsed one after another in channel order, never overlapping.
    Sequential,
}

impl EscProtocol {
    /// Decode a stored protocol byte. Unknown values fall back to [`EscProtocol::Pwm`].
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Oneshot125,
            2 => Self::Oneshot42,
            3 => Self::Multishot,
            4 => Self::Brushed,
            5 => Self::Dshot150,
            6 => Self::Dshot300,
            7 => Self::Dshot600,
            8 => Self::Dshot1200,
            9 => Self::Proshot,
            _ => Self::Pwm,
        }
    }

    /// Protocol byte as stored in configuration records.
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Cycle layout used to emit this protocol.
    #[must_use]
    pub const fn topology(self) -> Topology {
        match self {
            Self::Multishot => Topology::Sequential,
            _ => Topology::Concurrent,
        }
    }

    /// Whether this protocol must self-trigger from the timer.
    ///
    /// Brushed output is a duty cycle at a fixed carrier rate, so it cannot follow
    /// the control loop's `apply` calls.
    #[must_use]
    pub const fn requires_free_running(self) -> bool {
        matches!(self, Self::Brushed)
    }

    /// Whether this is a digital serial protocol (no bit framing is emitted here).
    #[must_use]
    pub const fn is_digital(self) -> bool {
        matches!(
            self,
            Self::Dshot150 | Self::Dshot300 | Self::Dshot600 | Self::Dshot1200 | Self::Proshot
        )
    }
}

impl From<u8> for EscProtocol {
    fn from(raw: u8) -> Self {
        Self::from_raw(raw)
    }
}

impl From<EscProtocol> for u8 {
    fn from(protocol: EscProtocol) -> Self {
        protocol.as_raw()
    }
}
