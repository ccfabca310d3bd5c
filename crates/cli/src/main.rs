// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use pinpulse_core::board::{BoardProfile, SocModel};
use pinpulse_core::clock::SystemClock;
use pinpulse_core::mmio::{DevMemWindow, MapError};
use pinpulse_core::pulse::{PulseConfig, PulseGenerator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

const EXIT_PRIVILEGE_ERROR: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

static CANCEL: AtomicBool = AtomicBool::new(false);

fn parse_pin(s: &str) -> Result<u8, String> {
    let pin: u8 = s
        .trim()
        .parse()
        .map_err(|e| format!("Invalid pin '{}': {}", s, e))?;
    if pin > pinpulse_core::gpio::MAX_PIN {
        return Err(format!(
            "Pin {} outside bank 0 (0-{})",
            pin,
            pinpulse_core::gpio::MAX_PIN
        ));
    }
    Ok(pin)
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "PinPulse: second-boundary GPIO pulse generator",
    long_about = None
)]
struct Cli {
    /// GPIO pin to toggle (bank 0, 0-31)
    #[arg(short, long, default_value = "26", value_parser = parse_pin)]
    pin: u8,

    /// Target board: bcm2835, bcm2836, bcm2711, or a 0x-prefixed peripheral base
    #[arg(short, long, default_value = "bcm2711")]
    board: SocModel,

    /// Board profile (YAML); takes precedence over --board
    #[arg(long)]
    board_file: Option<PathBuf>,

    /// Coarse sleep before each boundary busy-poll, in milliseconds
    #[arg(long, default_value = "900")]
    coarse_sleep_ms: u64,

    /// Enable debug-level tracing
    #[arg(short, long)]
    trace: bool,
}

fn resolve_board(cli: &Cli) -> anyhow::Result<(u64, u64)> {
    match &cli.board_file {
        Some(path) => {
            let profile = BoardProfile::from_file(path)?;
            info!("Using board profile '{}' from {:?}", profile.name, path);
            Ok((profile.peripheral_base()?, profile.gpio_offset()?))
        }
        None => Ok((
            cli.board.peripheral_base(),
            pinpulse_core::gpio::GPIO_REGISTER_OFFSET,
        )),
    }
}

extern "C" fn on_termination_signal(_sig: libc::c_int) {
    CANCEL.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    let handler = on_termination_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    let (peripheral_base, gpio_offset) = match resolve_board(&cli) {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(
        "Peripheral base {:#x}, GPIO block at +{:#x}, pin {}",
        peripheral_base, gpio_offset, cli.pin
    );

    let window = match DevMemWindow::open(peripheral_base, gpio_offset) {
        Ok(window) => window,
        Err(e @ MapError::Privilege { .. }) => {
            error!("{}", e);
            return ExitCode::from(EXIT_PRIVILEGE_ERROR);
        }
        Err(e @ MapError::UnalignedOffset(_)) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    install_signal_handlers();

    let config = PulseConfig {
        target_pin: cli.pin,
        coarse_sleep_ms: cli.coarse_sleep_ms,
        peripheral_base,
        region_offset: gpio_offset,
    };

    let mut generator = PulseGenerator::new(window, SystemClock, config);
    match generator.run(&CANCEL) {
        Ok(()) => {
            info!("Pulse generation stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}
