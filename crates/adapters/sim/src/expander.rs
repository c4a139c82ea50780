//! Simulated MCP23017 16-pin port expander with an interrupt latch.

use async_trait::async_trait;
use ponicwatch_app::ports::{Driver, Reading};
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::pin::{Pin, PinDirection};

const PIN_COUNT: usize = 16;

/// Two 8-pin banks. Pins 0..=7 are bank A, 8..=15 bank B. A write to a
/// pin programmed as input stands in for an external level change and
/// latches an interrupt; reading any pin clears the latch, like the
/// physical chip's port read does.
pub struct SimExpander {
    levels: [f64; PIN_COUNT],
    directions: [PinDirection; PIN_COUNT],
    latched: bool,
}

impl SimExpander {
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: [0.0; PIN_COUNT],
            directions: [PinDirection::Input; PIN_COUNT],
            latched: false,
        }
    }

    fn index(pin: Pin) -> Result<usize, PwError> {
        let index = usize::from(pin.number());
        if index < PIN_COUNT {
            Ok(index)
        } else {
            Err(PwError::ReadFailure(format!(
                "MCP23017 has 16 pins, got {}",
                pin.number()
            )))
        }
    }
}

impl Default for SimExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for SimExpander {
    fn kind(&self) -> &'static str {
        "MCP23017"
    }

    async fn read(&mut self, pin: Pin, _param: Option<&str>) -> Result<Reading, PwError> {
        let index = Self::index(pin)?;
        self.latched = false;
        let level = self.levels[index];
        Ok(Reading {
            raw: level,
            computed: level,
        })
    }

    async fn write(&mut self, pin: Pin, value: f64) -> Result<f64, PwError> {
        let index = Self::index(pin)?;
        self.levels[index] = value;
        if self.directions[index] == PinDirection::Input {
            self.latched = true;
        }
        Ok(value)
    }

    async fn set_pin_direction(
        &mut self,
        pin: Pin,
        direction: PinDirection,
    ) -> Result<(), PwError> {
        let index = Self::index(pin)?;
        self.directions[index] = direction;
        Ok(())
    }

    async fn interrupt_pending(&mut self) -> Result<bool, PwError> {
        Ok(self.latched)
    }

    async fn clear_interrupts(&mut self) -> Result<(), PwError> {
        self.latched = false;
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<(), PwError> {
        self.levels = [0.0; PIN_COUNT];
        self.latched = false;
        tracing::debug!("simulated expander released");
        Ok(())
    }
}
