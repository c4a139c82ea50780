//! Hardware driver port.
//!
//! Every IC is driven through the same narrow capability surface, so the
//! registry and the entity jobs never know which chip they are talking to.
//! Drivers are constructed through a [`DriverCatalog`] keyed by the kind
//! tag declared in the hardware record.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ponicwatch_domain::error::{PwError, UnknownHardwareKind};
use ponicwatch_domain::pin::{Pin, PinDirection};

/// One acquisition from a driver.
///
/// `raw` is whatever the chip returned (a count, a bit, a register value);
/// `computed` is the conversion into the metric the sensor reports. Drivers
/// that already return engineering units set the two equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub raw: f64,
    pub computed: f64,
}

/// The uniform capability every hardware driver implements.
///
/// Methods take `&mut self`: a driver owns exclusive chip state (bus
/// transactions, interrupt latches) and the registry serializes access
/// through a per-handle lock.
#[async_trait]
pub trait Driver: Send {
    /// The kind tag this driver was registered under.
    fn kind(&self) -> &'static str;

    /// Acquire one reading from a pin or channel. `param` carries the
    /// optional `hw_param` of the sensor init payload (e.g. `"T"` vs `"H"`
    /// on a combined temperature/humidity chip).
    async fn read(&mut self, pin: Pin, param: Option<&str>) -> Result<Reading, PwError>;

    /// Drive a pin to a level, returning the value actually applied.
    async fn write(&mut self, pin: Pin, value: f64) -> Result<f64, PwError>;

    /// Acquire `samples` readings with a short pause between them and
    /// average both fields. Drivers with chip-level averaging override this.
    async fn average(
        &mut self,
        pin: Pin,
        samples: u8,
        param: Option<&str>,
    ) -> Result<Reading, PwError> {
        let samples = samples.max(1);
        let mut raw = 0.0;
        let mut computed = 0.0;
        for i in 0..samples {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let reading = self.read(pin, param).await?;
            raw += reading.raw;
            computed += reading.computed;
        }
        let n = f64::from(samples);
        Ok(Reading {
            raw: raw / n,
            computed: computed / n,
        })
    }

    /// Program a pin direction. No-op for chips with fixed pin roles.
    async fn set_pin_direction(
        &mut self,
        _pin: Pin,
        _direction: PinDirection,
    ) -> Result<(), PwError> {
        Ok(())
    }

    /// Whether the chip currently latches a pending interrupt.
    async fn interrupt_pending(&mut self) -> Result<bool, PwError> {
        Ok(false)
    }

    /// Force-clear any latched interrupt state.
    async fn clear_interrupts(&mut self) -> Result<(), PwError> {
        Ok(())
    }

    /// Release chip resources. Called exactly once at shutdown.
    async fn cleanup(&mut self) -> Result<(), PwError>;
}

/// Constructor for a driver, fed the hardware record's parsed init payload.
pub type DriverFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Driver>, PwError> + Send + Sync>;

/// Kind-tag keyed factory registry.
#[derive(Default)]
pub struct DriverCatalog {
    factories: HashMap<String, DriverFactory>,
}

impl DriverCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a kind tag, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, factory: DriverFactory) {
        self.factories.insert(kind.into(), factory);
    }

    /// Instantiate a driver for a hardware record.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownHardwareKind`] when no factory is registered for
    /// the tag, or the factory's own error when construction fails.
    pub fn create(
        &self,
        kind: &str,
        init: &serde_json::Value,
    ) -> Result<Box<dyn Driver>, PwError> {
        let factory = self.factories.get(kind).ok_or_else(|| UnknownHardwareKind {
            kind: kind.to_string(),
        })?;
        factory(init)
    }

    /// The registered kind tags, for startup logging.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDriver(f64);

    #[async_trait]
    impl Driver for FixedDriver {
        fn kind(&self) -> &'static str {
            "FIXED"
        }

        async fn read(&mut self, _pin: Pin, _param: Option<&str>) -> Result<Reading, PwError> {
            self.0 += 1.0;
            Ok(Reading {
                raw: self.0,
                computed: self.0 * 2.0,
            })
        }

        async fn write(&mut self, _pin: Pin, value: f64) -> Result<f64, PwError> {
            Ok(value)
        }

        async fn cleanup(&mut self) -> Result<(), PwError> {
            Ok(())
        }
    }

    fn catalog() -> DriverCatalog {
        let mut catalog = DriverCatalog::new();
        catalog.register("FIXED", Box::new(|_| Ok(Box::new(FixedDriver(0.0)))));
        catalog
    }

    #[tokio::test]
    async fn should_create_driver_for_registered_kind() {
        let driver = catalog().create("FIXED", &serde_json::json!({})).unwrap();
        assert_eq!(driver.kind(), "FIXED");
    }

    #[test]
    fn should_reject_unregistered_kind() {
        let Err(err) = catalog().create("MCP9999", &serde_json::json!({})) else {
            panic!("unregistered kind must not construct a driver");
        };
        assert!(matches!(err, PwError::UnknownHardwareKind(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn should_average_multiple_samples() {
        let mut driver = FixedDriver(0.0);
        // Readings 1, 2, 3 -> mean 2; computed doubles each.
        let reading = driver.average(Pin::new(0), 3, None).await.unwrap();
        assert!((reading.raw - 2.0).abs() < f64::EPSILON);
        assert!((reading.computed - 4.0).abs() < f64::EPSILON);
    }
}
