//! Interrupt-driven ESC and servo output for Pico 1 and 2 flight controllers.
//!
//! One hardware timer drives up to `N` output pins. The foreground control loop writes
//! pulse widths whenever it likes; the timer interrupt turns them into waveforms, one
//! refresh cycle at a time. See [`driver`] for the main entry point.
//!
//! # Glossary
//!
//! - **Tick:** one count of the backend's free-running timer, the internal time unit.
//!   Widths are converted from microseconds once, at the API boundary.
//! - **Slot:** one channel's pin, width, and (in the concurrent topology) the gap
//!   between its falling edge and the previous one.
//! - **Commit:** the once-per-cycle snapshot (and sort) of the write buffer that the
//!   interrupt handler runs against.
//! - **Concurrent topology:** all active pins rise together and fall one by one.
//! - **Sequential topology:** pins are pulsed one at a time, back to back.
//! - **Free running / synchronized:** cycles are started by the timer itself, or by
//!   the control loop calling [`apply`](driver::EscDriver::apply).
#![cfg_attr(not(feature = "host"), no_std)]

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

pub mod config;
pub mod driver;
mod error;
pub mod hal;
pub mod protocol;
pub mod scheduler;
pub mod slot;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
