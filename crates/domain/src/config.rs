//! Per-entity init configs.
//!
//! Every entity row carries a free-form JSON payload holding driver-specific
//! parameters. This module parses the recognized keys into a typed
//! [`InitConfig`]. A malformed payload is a construction-time warning, not a
//! fatal error: the caller degrades the entity to inactive and keeps building
//! the rest of the graph.

use std::str::FromStr;

use serde_json::Value;

use crate::error::ConfigError;
use crate::expression::GuardSource;
use crate::pin::Pin;

/// Target value a switch applies when its job fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// `"t"` / `"T"` marker: flip the previous stored value.
    Toggle,
    /// Set the pin to this exact level. `0.0` is a valid level;
    /// "unset" is expressed by the absence of the key, never by falsiness.
    Level(f64),
}

/// A power-control reference: another hardware handle + pin toggled around a
/// sensor read, e.g. `"MCP3208.1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerRef {
    /// Name of the hardware record providing the power pin.
    pub hardware: String,
    pub pin: Pin,
}

impl FromStr for PowerRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hardware, pin) = s
            .rsplit_once('.')
            .ok_or_else(|| ConfigError::new(format!("power ref {s:?} missing '.' separator")))?;
        if hardware.is_empty() {
            return Err(ConfigError::new(format!("power ref {s:?} missing hardware name")));
        }
        let pin = pin
            .parse()
            .map_err(|_| ConfigError::new(format!("power ref {s:?} has a bad pin")))?;
        Ok(Self {
            hardware: hardware.to_string(),
            pin,
        })
    }
}

/// Action tag executed when an interrupt fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptAction {
    /// Send a notification through the notifier collaborator.
    Notify,
    /// Only append a log record.
    #[default]
    Log,
}

/// Parsed init payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitConfig {
    /// Pin within the owning IC.
    pub pin: Option<Pin>,
    /// Extra driver parameter, e.g. `"T"` vs `"H"` on a DHT chip.
    pub hw_param: Option<String>,
    /// Power-control pre/post actuation reference.
    pub power: Option<PowerRef>,
    /// Settle delay in seconds between power-on and the actual read.
    pub power_delay: f64,
    /// Guard expression gating switch actuation.
    pub guard: Option<GuardSource>,
    /// Value a switch applies when triggered.
    pub set_value_to: Option<Target>,
    /// Number of raw samples to average per reading.
    pub samples: Option<u8>,
    /// Interrupt action tag.
    pub action: InterruptAction,
    /// Unrecognized keys, passed through to the driver untouched.
    pub extra: serde_json::Map<String, Value>,
}

impl InitConfig {
    /// Parse an init payload from its JSON text.
    ///
    /// An empty or blank payload is legal and yields the default config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is not a JSON object or a
    /// recognized key holds an unusable value.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(text)
            .map_err(|err| ConfigError::new(format!("not valid JSON: {err}")))?;
        let Value::Object(map) = value else {
            return Err(ConfigError::new("payload must be a JSON object"));
        };

        let mut config = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "pin" => {
                    config.pin = Some(
                        Pin::from_json(&value)
                            .map_err(|err| ConfigError::new(err.to_string()))?,
                    );
                }
                "hw_param" => {
                    config.hw_param = Some(as_string(&key, &value)?);
                }
                "POWER" => {
                    config.power = Some(as_string(&key, &value)?.parse()?);
                }
                "power_delay" => {
                    let delay = value
                        .as_f64()
                        .ok_or_else(|| ConfigError::new("power_delay must be a number"))?;
                    if !(0.0..=60.0).contains(&delay) {
                        return Err(ConfigError::new(format!(
                            "power_delay {delay} out of range 0..=60"
                        )));
                    }
                    config.power_delay = delay;
                }
                "if" => {
                    config.guard = Some(GuardSource::from_json(&value)?);
                }
                "set_value_to" => {
                    config.set_value_to = Some(parse_target(&value)?);
                }
                "samples" => {
                    let samples = value
                        .as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ConfigError::new("samples must be 1..=255"))?;
                    config.samples = Some(samples);
                }
                "action" => {
                    config.action = match as_string(&key, &value)?.as_str() {
                        "notify" => InterruptAction::Notify,
                        "log" => InterruptAction::Log,
                        other => {
                            return Err(ConfigError::new(format!(
                                "unknown interrupt action {other:?}"
                            )));
                        }
                    };
                }
                _ => {
                    config.extra.insert(key, value);
                }
            }
        }
        Ok(config)
    }
}

fn as_string(key: &str, value: &Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::new(format!("{key} must be a string")))
}

fn parse_target(value: &Value) -> Result<Target, ConfigError> {
    match value {
        Value::String(s) if s == "t" || s == "T" => Ok(Target::Toggle),
        Value::String(s) => s
            .parse::<f64>()
            .map(Target::Level)
            .map_err(|_| ConfigError::new(format!("set_value_to {s:?} is not a number"))),
        Value::Number(n) => n
            .as_f64()
            .map(Target::Level)
            .ok_or_else(|| ConfigError::new("set_value_to out of range")),
        _ => Err(ConfigError::new("set_value_to must be a number or toggle marker")),
    }
}
