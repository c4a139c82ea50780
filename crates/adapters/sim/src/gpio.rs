//! Simulated Raspberry Pi GPIO bank (`RPI3`).

use std::collections::HashMap;

use async_trait::async_trait;
use ponicwatch_app::ports::{Driver, Reading};
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::pin::{Pin, PinDirection};

/// In-memory pin bank. The init payload may pre-declare directions with
/// `"IN"` and `"OUT"` pin arrays, matching the physical driver's payload.
pub struct SimGpio {
    levels: HashMap<u8, f64>,
    directions: HashMap<u8, PinDirection>,
}

impl SimGpio {
    /// Build the bank from a hardware init payload.
    ///
    /// # Errors
    ///
    /// Fails when a declared pin descriptor does not parse.
    pub fn new(init: &serde_json::Value) -> Result<Self, PwError> {
        let mut directions = HashMap::new();
        for (key, direction) in [("IN", PinDirection::Input), ("OUT", PinDirection::Output)] {
            let Some(pins) = init.get(key).and_then(serde_json::Value::as_array) else {
                continue;
            };
            for value in pins {
                let pin = Pin::from_json(value)?;
                directions.insert(pin.number(), direction);
            }
        }
        Ok(Self {
            levels: HashMap::new(),
            directions,
        })
    }
}

#[async_trait]
impl Driver for SimGpio {
    fn kind(&self) -> &'static str {
        "RPI3"
    }

    async fn read(&mut self, pin: Pin, _param: Option<&str>) -> Result<Reading, PwError> {
        let level = self.levels.get(&pin.number()).copied().unwrap_or(0.0);
        Ok(Reading {
            raw: level,
            computed: level,
        })
    }

    async fn write(&mut self, pin: Pin, value: f64) -> Result<f64, PwError> {
        if self.directions.get(&pin.number()) == Some(&PinDirection::Input) {
            return Err(PwError::WriteFailure(format!(
                "GPIO {} is configured as input",
                pin.number()
            )));
        }
        self.levels.insert(pin.number(), value);
        Ok(value)
    }

    async fn set_pin_direction(
        &mut self,
        pin: Pin,
        direction: PinDirection,
    ) -> Result<(), PwError> {
        self.directions.insert(pin.number(), direction);
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<(), PwError> {
        // Outputs are driven low on release, like the physical bank.
        for level in self.levels.values_mut() {
            *level = 0.0;
        }
        tracing::debug!("simulated GPIO bank released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_read_back_written_level() {
        let mut gpio = SimGpio::new(&serde_json::json!({})).unwrap();
        gpio.write(Pin::new(17), 1.0).await.unwrap();
        let reading = gpio.read(Pin::new(17), None).await.unwrap();
        assert!((reading.computed - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_refuse_write_to_declared_input() {
        let mut gpio = SimGpio::new(&serde_json::json!({"IN": [4], "OUT": [17]})).unwrap();
        assert!(gpio.write(Pin::new(4), 1.0).await.is_err());
        assert!(gpio.write(Pin::new(17), 1.0).await.is_ok());
    }

    #[tokio::test]
    async fn should_drive_pins_low_on_cleanup() {
        let mut gpio = SimGpio::new(&serde_json::json!({})).unwrap();
        gpio.write(Pin::new(17), 1.0).await.unwrap();
        gpio.cleanup().await.unwrap();
        let reading = gpio.read(Pin::new(17), None).await.unwrap();
        assert!(reading.computed.abs() < f64::EPSILON);
    }

    #[test]
    fn should_reject_bad_pin_in_init() {
        assert!(SimGpio::new(&serde_json::json!({"IN": ["Z9"]})).is_err());
    }
}
