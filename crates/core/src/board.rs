// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Parse a decimal or `0x`-prefixed physical address.
pub fn parse_addr(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u64::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

/// Known SoC models and their peripheral base addresses.
///
/// The GPIO block itself sits at the same offset on every BCM283x; only the
/// peripheral base moves between Pi revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocModel {
    Bcm2835,
    Bcm2836,
    Bcm2711,
    Custom(u64),
}

impl SocModel {
    pub fn peripheral_base(self) -> u64 {
        match self {
            SocModel::Bcm2835 => 0x2000_0000,
            SocModel::Bcm2836 => 0x3F00_0000,
            SocModel::Bcm2711 => 0xFE00_0000,
            SocModel::Custom(base) => base,
        }
    }
}

impl FromStr for SocModel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "bcm2835" | "pi1" | "pizero" => Ok(Self::Bcm2835),
            "bcm2836" | "bcm2837" | "pi2" | "pi3" => Ok(Self::Bcm2836),
            "bcm2711" | "pi4" => Ok(Self::Bcm2711),
            _ if v.starts_with("0x") => parse_addr(&v).map(Self::Custom),
            _ => Err(format!(
                "unsupported board '{}'; supported: bcm2835, bcm2836, bcm2711, or a 0x-prefixed peripheral base",
                value
            )),
        }
    }
}

/// Board description loaded from YAML, for targets outside the preset table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardProfile {
    pub name: String,
    /// Decimal or 0x-prefixed physical address.
    pub peripheral_base: String,
    /// Byte offset of the GPIO block within peripheral space.
    #[serde(default = "default_gpio_offset")]
    pub gpio_offset: String,
}

fn default_gpio_offset() -> String {
    format!("{:#x}", crate::gpio::GPIO_REGISTER_OFFSET)
}

impl BoardProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board profile {:?}", path))?;
        let profile: BoardProfile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse board profile {:?}", path))?;
        Ok(profile)
    }

    pub fn peripheral_base(&self) -> Result<u64> {
        parse_addr(&self.peripheral_base).map_err(anyhow::Error::msg)
    }

    pub fn gpio_offset(&self) -> Result<u64> {
        parse_addr(&self.gpio_offset).map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_bases() {
        assert_eq!(SocModel::Bcm2835.peripheral_base(), 0x2000_0000);
        assert_eq!(SocModel::Bcm2836.peripheral_base(), 0x3F00_0000);
        assert_eq!(SocModel::Bcm2711.peripheral_base(), 0xFE00_0000);
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!("bcm2711".parse::<SocModel>().unwrap(), SocModel::Bcm2711);
        assert_eq!("Pi4".parse::<SocModel>().unwrap(), SocModel::Bcm2711);
        assert_eq!("pi3".parse::<SocModel>().unwrap(), SocModel::Bcm2836);
        assert_eq!(
            "0x3F000000".parse::<SocModel>().unwrap(),
            SocModel::Custom(0x3F00_0000)
        );
        assert!("bcm9999".parse::<SocModel>().is_err());
    }

    #[test]
    fn test_parse_addr_forms() {
        assert_eq!(parse_addr("0xFE000000").unwrap(), 0xFE00_0000);
        assert_eq!(parse_addr("4096").unwrap(), 4096);
        assert!(parse_addr("nonsense").is_err());
    }

    #[test]
    fn test_profile_yaml() {
        let profile: BoardProfile = serde_yaml::from_str(
            "name: bench-pi\nperipheral_base: \"0xFE000000\"\n",
        )
        .unwrap();
        assert_eq!(profile.name, "bench-pi");
        assert_eq!(profile.peripheral_base().unwrap(), 0xFE00_0000);
        // gpio_offset falls back to the BCM283x GPIO block offset.
        assert_eq!(profile.gpio_offset().unwrap(), 0x20_0000);
    }

    #[test]
    fn test_profile_from_missing_file() {
        let err = BoardProfile::from_file("/nonexistent/board.yaml").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read board profile"));
    }
}
