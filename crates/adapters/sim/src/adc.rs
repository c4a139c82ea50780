//! Simulated MCP3208 12-bit, 8-channel ADC.

use std::collections::HashMap;

use async_trait::async_trait;
use ponicwatch_app::ports::{Driver, Reading};
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::pin::Pin;

const CHANNELS: u8 = 8;
const FULL_SCALE: f64 = 4096.0;

/// Input-only converter. `raw` is the 12-bit count, `computed` the voltage
/// against the reference (init key `"vref"`, default 3.3).
pub struct SimAdc {
    vref: f64,
    steps: HashMap<u8, u64>,
}

impl SimAdc {
    #[must_use]
    pub fn new(init: &serde_json::Value) -> Self {
        let vref = init.get("vref").and_then(serde_json::Value::as_f64).unwrap_or(3.3);
        Self {
            vref,
            steps: HashMap::new(),
        }
    }
}

#[async_trait]
impl Driver for SimAdc {
    fn kind(&self) -> &'static str {
        "MCP3208"
    }

    async fn read(&mut self, pin: Pin, _param: Option<&str>) -> Result<Reading, PwError> {
        let channel = pin.number();
        if channel >= CHANNELS {
            return Err(PwError::ReadFailure(format!(
                "MCP3208 has 8 channels, got {channel}"
            )));
        }
        let step = self.steps.entry(channel).or_insert(0);
        *step += 1;
        // Deterministic mid-scale count, distinct per channel and step.
        let count = (*step * 181 + u64::from(channel) * 997) % 4096;
        let raw = f64::from(u16::try_from(count).unwrap_or(0));
        Ok(Reading {
            raw,
            computed: raw * self.vref / FULL_SCALE,
        })
    }

    async fn write(&mut self, _pin: Pin, _value: f64) -> Result<f64, PwError> {
        Err(PwError::WriteFailure(
            "MCP3208 is an input-only converter".to_string(),
        ))
    }

    async fn cleanup(&mut self) -> Result<(), PwError> {
        Ok(())
    }
}
