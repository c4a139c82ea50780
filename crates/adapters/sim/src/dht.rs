//! Simulated DHT-family combined temperature/humidity chip
//! (`DHT11` / `DHT22` / `AM2302`).

use async_trait::async_trait;
use ponicwatch_app::ports::{Driver, Reading};
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::pin::Pin;

use crate::wobble;

const BASE_TEMPERATURE: f64 = 21.0;
const BASE_HUMIDITY: f64 = 55.0;

/// The `hw_param` of the sensor picks the metric: `"T"` for temperature
/// (the default), `"H"` for relative humidity. The chip reports
/// engineering units directly, so `raw == computed`.
pub struct SimDht {
    kind: &'static str,
    step: u64,
}

impl SimDht {
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self { kind, step: 0 }
    }
}

#[async_trait]
impl Driver for SimDht {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn read(&mut self, _pin: Pin, param: Option<&str>) -> Result<Reading, PwError> {
        self.step += 1;
        let value = match param {
            None | Some("T") => BASE_TEMPERATURE + wobble(self.step, 1.5),
            Some("H") => BASE_HUMIDITY + wobble(self.step.wrapping_add(7), 4.0),
            Some(other) => {
                return Err(PwError::ReadFailure(format!(
                    "{} knows T and H, got {other:?}",
                    self.kind
                )));
            }
        };
        Ok(Reading {
            raw: value,
            computed: value,
        })
    }

    async fn write(&mut self, _pin: Pin, _value: f64) -> Result<f64, PwError> {
        Err(PwError::WriteFailure(format!(
            "{} is a read-only sensor chip",
            self.kind
        )))
    }

    async fn cleanup(&mut self) -> Result<(), PwError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_report_temperature_by_default() {
        let mut chip = SimDht::new("DHT22");
        let reading = chip.read(Pin::new(0), None).await.unwrap();
        assert!((reading.computed - BASE_TEMPERATURE).abs() <= 1.5);
    }

    #[tokio::test]
    async fn should_report_humidity_for_h_param() {
        let mut chip = SimDht::new("AM2302");
        let reading = chip.read(Pin::new(0), Some("H")).await.unwrap();
        assert!((reading.computed - BASE_HUMIDITY).abs() <= 4.0);
    }

    #[tokio::test]
    async fn should_reject_unknown_param() {
        let mut chip = SimDht::new("DHT11");
        assert!(chip.read(Pin::new(0), Some("X")).await.is_err());
    }
}
