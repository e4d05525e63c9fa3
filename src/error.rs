//! Error type shared by every device abstraction in this crate.

use derive_more::{Display, Error};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors returned by the ESC driver facade.
///
/// Once a driver is running, a bad channel index is the only failure. A table with
/// no active channels, or an `apply` during a cycle, is not an error.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel index is not below the configured channel count.
    #[display("channel {channel} out of range (channel count is {count})")]
    ChannelOutOfRange {
        /// Rejected channel index.
        channel: usize,
        /// Channel count fixed at construction.
        count: usize,
    },
    /// The driver static already owns a scheduler and hardware backend.
    #[display("ESC driver already initialized")]
    AlreadyInitialized,
    /// The driver static has no scheduler yet.
    #[display("ESC driver not initialized")]
    NotInitialized,
}
