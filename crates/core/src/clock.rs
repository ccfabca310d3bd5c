// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("wall clock read failed")]
    ReadFailed,
    #[error("system clock predates the unix epoch")]
    BeforeEpoch,
}

/// Source of the wall clock's sub-second component.
///
/// The pulse loop only ever needs the nanosecond fraction; modeling just that
/// keeps the boundary detector trivially scriptable in tests.
pub trait WallClock {
    fn subsec_nanos(&mut self) -> Result<u32, ClockError>;
}

/// CLOCK_REALTIME via `SystemTime`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn subsec_nanos(&mut self) -> Result<u32, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .map_err(|_| ClockError::BeforeEpoch)
    }
}

/// Busy-poll until the sub-second count wraps back toward zero.
///
/// The wrap (a sample strictly smaller than its predecessor) marks the start
/// of a new wall-clock second. `prev` carries the last observed sample across
/// calls so the detector fires exactly once per boundary. There is no
/// timeout: a clock that stops advancing makes correct signaling impossible,
/// and a failed read propagates as [`ClockError`]. Returns `Ok(None)` when
/// `cancel` is raised mid-poll.
pub fn await_second_wrap<C: WallClock>(
    clock: &mut C,
    prev: &mut u32,
    cancel: &AtomicBool,
) -> Result<Option<u32>, ClockError> {
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let now = clock.subsec_nanos()?;
        let wrapped = now < *prev;
        *prev = now;
        if wrapped {
            return Ok(Some(now));
        }
    }
}

/// Replays a canned nanosecond sequence; for tests and hosted dry runs.
///
/// When the script runs out it either fails the next read or raises the
/// attached cancellation flag while repeating the final sample, so a pulse
/// loop under test winds down instead of spinning.
#[derive(Debug, Default)]
pub struct ScriptedClock {
    samples: VecDeque<u32>,
    fail_when_exhausted: bool,
    cancel_when_exhausted: Option<Arc<AtomicBool>>,
    last: u32,
}

impl ScriptedClock {
    pub fn new(samples: impl IntoIterator<Item = u32>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Fail the first read past the end of the script.
    pub fn failing_when_exhausted(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }

    /// Raise `cancel` once the script is exhausted, repeating the last sample.
    pub fn cancelling_when_exhausted(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel_when_exhausted = Some(cancel);
        self
    }
}

impl WallClock for ScriptedClock {
    fn subsec_nanos(&mut self) -> Result<u32, ClockError> {
        match self.samples.pop_front() {
            Some(s) => {
                self.last = s;
                Ok(s)
            }
            None if self.fail_when_exhausted => Err(ClockError::ReadFailed),
            None => {
                if let Some(cancel) = &self.cancel_when_exhausted {
                    cancel.store(true, Ordering::Relaxed);
                }
                Ok(self.last)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_detected_on_first_decrease() {
        let cancel = AtomicBool::new(false);
        let mut clock = ScriptedClock::new([999_999_000, 999_999_500, 50, 1_000]);
        let mut prev = 0;

        let fired = await_second_wrap(&mut clock, &mut prev, &cancel).unwrap();
        assert_eq!(fired, Some(50));
        // Detector consumed nothing past the wrap sample.
        assert_eq!(clock.subsec_nanos().unwrap(), 1_000);
    }

    #[test]
    fn test_wrap_fires_once_per_boundary() {
        let cancel = AtomicBool::new(false);
        let mut clock = ScriptedClock::new([
            900_000_000,
            999_000_000,
            10, // first boundary
            500_000_000,
            999_999_999,
            20, // second boundary
        ]);
        let mut prev = 0;

        assert_eq!(
            await_second_wrap(&mut clock, &mut prev, &cancel).unwrap(),
            Some(10)
        );
        assert_eq!(
            await_second_wrap(&mut clock, &mut prev, &cancel).unwrap(),
            Some(20)
        );
    }

    #[test]
    fn test_read_failure_propagates() {
        let cancel = AtomicBool::new(false);
        let mut clock = ScriptedClock::new([100, 200]).failing_when_exhausted();
        let mut prev = 0;

        let err = await_second_wrap(&mut clock, &mut prev, &cancel).unwrap_err();
        assert!(matches!(err, ClockError::ReadFailed));
    }

    #[test]
    fn test_cancellation_stops_poll() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut clock =
            ScriptedClock::new([100, 200, 300]).cancelling_when_exhausted(Arc::clone(&cancel));
        let mut prev = 0;

        // No wrap in the script; the exhausted clock raises cancel instead.
        let fired = await_second_wrap(&mut clock, &mut prev, &cancel).unwrap();
        assert_eq!(fired, None);
        assert!(cancel.load(Ordering::Relaxed));
    }

    #[test]
    fn test_system_clock_in_range() {
        let mut clock = SystemClock;
        let ns = clock.subsec_nanos().unwrap();
        assert!(ns < 1_000_000_000);
    }
}
