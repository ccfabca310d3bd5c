// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod board;
pub mod clock;
pub mod gpio;
pub mod mmio;
pub mod pulse;
pub mod sched;

/// Top-level error for pulse generation.
///
/// Every variant except [`sched::SchedError`] (which is handled in-loop as a
/// degradation, never surfaced here) is fatal for the process: the conditions
/// are environmental and will not change within a single run.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error(transparent)]
    Map(#[from] mmio::MapError),
    #[error(transparent)]
    Register(#[from] mmio::MmioError),
    #[error(transparent)]
    Clock(#[from] clock::ClockError),
    #[error("GPIO pin {0} outside supported bank 0 (pins 0-31)")]
    UnsupportedPin(u8),
}

pub type PulseResult<T> = Result<T, PulseError>;
