//! Pin descriptors.
//!
//! Init payloads reference IC pins three ways: a plain integer (`4`), a
//! `0x`-prefixed hex string (`"0x0A"`), or a bank-relative token for 16-pin
//! expanders (`"A0"`..`"A7"` map to 0..7, `"B0"`..`"B7"` to 8..15).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A pin number within one IC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(u8);

/// Direction programmed into a R/W-capable IC before first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

/// Malformed pin descriptor.
#[derive(Debug, thiserror::Error)]
#[error("invalid pin descriptor: {descriptor:?}")]
pub struct PinError {
    /// The text that failed to parse.
    pub descriptor: String,
}

impl Pin {
    /// Wrap a raw pin number.
    #[must_use]
    pub fn new(pin: u8) -> Self {
        Self(pin)
    }

    /// The raw pin number.
    #[must_use]
    pub fn number(self) -> u8 {
        self.0
    }

    /// Parse any accepted descriptor shape from a JSON value
    /// (number or string).
    ///
    /// # Errors
    ///
    /// Returns [`PinError`] if the value is neither a non-negative integer
    /// nor a recognized string descriptor.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PinError> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .map(Self)
                .ok_or_else(|| PinError {
                    descriptor: value.to_string(),
                }),
            serde_json::Value::String(s) => s.parse(),
            _ => Err(PinError {
                descriptor: value.to_string(),
            }),
        }
    }
}

impl FromStr for Pin {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PinError {
            descriptor: s.to_string(),
        };
        // Bank-relative token: A0..A7 -> 0..7, B0..B7 -> 8..15.
        if let Some(rest) = s.strip_prefix('A').or_else(|| s.strip_prefix('B')) {
            if let Ok(offset) = rest.parse::<u8>() {
                if offset < 8 {
                    let base = if s.starts_with('A') { 0 } else { 8 };
                    return Ok(Self(base + offset));
                }
            }
            return Err(err());
        }
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u8::from_str_radix(hex, 16).map(Self).map_err(|_| err());
        }
        s.parse::<u8>().map(Self).map_err(|_| err())
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
