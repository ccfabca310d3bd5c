// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::clock::{await_second_wrap, WallClock};
use crate::gpio::GpioBank;
use crate::mmio::RegisterWindow;
use crate::{sched, PulseResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Direction of the next transition. Alternates unconditionally; the pulse
/// itself is the only state the loop carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    #[default]
    Rising,
    Falling,
}

impl Edge {
    pub fn next(self) -> Self {
        match self {
            Edge::Rising => Edge::Falling,
            Edge::Falling => Edge::Rising,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// GPIO pin to toggle (bank 0, so 0-31).
    pub target_pin: u8,
    /// Coarse sleep before each busy-poll, in milliseconds. Must leave enough
    /// margin for the poll to reach the boundary; 900 ms against a 1 s period.
    pub coarse_sleep_ms: u64,
    /// Physical base of the SoC peripheral space.
    pub peripheral_base: u64,
    /// Byte offset of the mapped register block within peripheral space.
    pub region_offset: u64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            target_pin: 26,
            coarse_sleep_ms: 900,
            peripheral_base: 0xFE00_0000, // BCM2711
            region_offset: crate::gpio::GPIO_REGISTER_OFFSET,
        }
    }
}

impl PulseConfig {
    pub fn coarse_sleep(&self) -> Duration {
        Duration::from_millis(self.coarse_sleep_ms)
    }
}

/// Toggles one GPIO pin at wall-clock second boundaries.
///
/// Each detected boundary produces one edge, so the pin holds each level for
/// roughly one second and a full HIGH/LOW cycle takes roughly two.
pub struct PulseGenerator<W: RegisterWindow, C: WallClock> {
    gpio: GpioBank<W>,
    clock: C,
    config: PulseConfig,
}

impl<W: RegisterWindow, C: WallClock> PulseGenerator<W, C> {
    pub fn new(window: W, clock: C, config: PulseConfig) -> Self {
        Self {
            gpio: GpioBank::new(window),
            clock,
            config,
        }
    }

    /// Give the window back, for harnesses that inspect register traffic.
    pub fn into_window(self) -> W {
        self.gpio.into_window()
    }

    /// Run until `cancel` is raised.
    ///
    /// Normal operation never returns on its own; an `Err` means the wall
    /// clock failed mid-poll or a register access fell outside the window,
    /// both of which make further signaling meaningless.
    pub fn run(&mut self, cancel: &AtomicBool) -> PulseResult<()> {
        if let Err(e) = sched::elevate_to_realtime() {
            tracing::warn!("Continuing without realtime priority: {}", e);
        }

        let pin = self.config.target_pin;
        self.gpio.configure_as_output(pin)?;

        tracing::info!(
            "Starting pulses: one edge per second boundary on GPIO {}",
            pin
        );

        let mut edge = Edge::Rising;
        let mut last_nanos: u32 = 0;
        loop {
            std::thread::sleep(self.config.coarse_sleep());

            let Some(wrap_nanos) = await_second_wrap(&mut self.clock, &mut last_nanos, cancel)?
            else {
                tracing::info!("Pulse loop cancelled");
                return Ok(());
            };

            match edge {
                Edge::Rising => self.gpio.set(pin)?,
                Edge::Falling => self.gpio.clear(pin)?,
            }

            // Bracket the transition: wrap sample before, fresh sample after.
            let after_nanos = self.clock.subsec_nanos()?;
            last_nanos = after_nanos;
            tracing::info!("Signal: {} - {} ns", wrap_nanos, after_nanos);

            edge = edge.next();
        }
    }
}
