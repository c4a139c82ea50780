//! Simulated DS18B20 one-wire temperature probe.

use async_trait::async_trait;
use ponicwatch_app::ports::{Driver, Reading};
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::pin::Pin;

use crate::wobble;

/// Reports °C around a configurable base (init key `"base"`, default
/// 19.5). The probe addresses itself; the pin is ignored.
pub struct SimProbe {
    base: f64,
    step: u64,
}

impl SimProbe {
    #[must_use]
    pub fn new(init: &serde_json::Value) -> Self {
        let base = init.get("base").and_then(serde_json::Value::as_f64).unwrap_or(19.5);
        Self { base, step: 0 }
    }
}

#[async_trait]
impl Driver for SimProbe {
    fn kind(&self) -> &'static str {
        "DS18B20"
    }

    async fn read(&mut self, _pin: Pin, _param: Option<&str>) -> Result<Reading, PwError> {
        self.step += 1;
        let value = self.base + wobble(self.step, 0.8);
        Ok(Reading {
            raw: value,
            computed: value,
        })
    }

    async fn write(&mut self, _pin: Pin, _value: f64) -> Result<f64, PwError> {
        Err(PwError::WriteFailure(
            "DS18B20 is a read-only probe".to_string(),
        ))
    }

    async fn cleanup(&mut self) -> Result<(), PwError> {
        Ok(())
    }
}
