//! Lifecycle modes decoded from the integer codes stored in the database.
//!
//! Each entity kind carries its own mode set. Inactive entities are kept in
//! the registry for reference resolution but never schedule jobs and never
//! touch hardware.

use serde::{Deserialize, Serialize};

/// Access mode of a hardware IC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareMode {
    /// IC can only be accessed for reading data.
    Read,
    /// IC can only be accessed for writing data.
    Write,
    /// IC supports both read and write; pin directions are programmed
    /// before first use.
    ReadWrite,
}

impl HardwareMode {
    /// Decode the database integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            2 => Some(Self::ReadWrite),
            _ => None,
        }
    }

    /// Encode back to the database integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::ReadWrite => 2,
        }
    }
}

/// Acquisition mode of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    /// Sensor is ignored: no job, no hardware call.
    Inactive,
    /// 0/1 pin input reflecting an on/off contactor.
    Digital,
    /// ADC reading, raw float converted to engineering units.
    Analog,
    /// The IC itself returns engineering units (i2c / 1-wire chips);
    /// computed value equals the raw value.
    Direct,
}

impl SensorMode {
    /// Decode the database integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::Inactive),
            0 => Some(Self::Digital),
            1 => Some(Self::Analog),
            2 => Some(Self::Direct),
            _ => None,
        }
    }

    /// Encode back to the database integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Inactive => -1,
            Self::Digital => 0,
            Self::Analog => 1,
            Self::Direct => 2,
        }
    }

    /// Whether this sensor participates in scheduling at all.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

/// Operating mode of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMode {
    /// Switch is ignored: no job, no hardware call.
    Inactive,
    /// Forced off at startup; no scheduled actuation.
    Off,
    /// Forced on at startup; no scheduled actuation.
    On,
    /// The scheduler drives the switch from its timer and guard expression.
    Auto,
}

impl SwitchMode {
    /// Decode the database integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::Inactive),
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Auto),
            _ => None,
        }
    }

    /// Encode back to the database integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Inactive => -1,
            Self::Off => 0,
            Self::On => 1,
            Self::Auto => 2,
        }
    }

    /// Whether this switch participates in scheduling at all.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_hardware_mode_codes() {
        for code in 0..=2 {
            let mode = HardwareMode::from_code(code).unwrap();
            assert_eq!(mode.code(), code);
        }
    }

    #[test]
    fn should_reject_unknown_hardware_mode_code() {
        assert!(HardwareMode::from_code(7).is_none());
    }

    #[test]
    fn should_roundtrip_sensor_mode_codes() {
        for code in -1..=2 {
            let mode = SensorMode::from_code(code).unwrap();
            assert_eq!(mode.code(), code);
        }
    }

    #[test]
    fn should_report_inactive_sensor_as_not_active() {
        assert!(!SensorMode::Inactive.is_active());
        assert!(SensorMode::Direct.is_active());
    }

    #[test]
    fn should_roundtrip_switch_mode_codes() {
        for code in -1..=2 {
            let mode = SwitchMode::from_code(code).unwrap();
            assert_eq!(mode.code(), code);
        }
    }

    #[test]
    fn should_report_inactive_switch_as_not_active() {
        assert!(!SwitchMode::Inactive.is_active());
        assert!(SwitchMode::Auto.is_active());
    }
}
