//! # ponicwatch-adapter-sim
//!
//! Simulated hardware drivers, registered under the same kind tags as the
//! physical chips they stand in for. Readings are deterministic waveforms,
//! so a supervisor wired to this catalog behaves reproducibly without any
//! hardware attached.

pub mod adc;
pub mod dht;
pub mod expander;
pub mod gpio;
pub mod probe;

use ponicwatch_app::ports::DriverCatalog;

/// Catalog with every simulated chip registered.
#[must_use]
pub fn catalog() -> DriverCatalog {
    let mut catalog = DriverCatalog::new();
    catalog.register(
        "RPI3",
        Box::new(|init: &serde_json::Value| Ok(Box::new(gpio::SimGpio::new(init)?))),
    );
    catalog.register(
        "MCP23017",
        Box::new(|_: &serde_json::Value| Ok(Box::new(expander::SimExpander::new()))),
    );
    catalog.register(
        "MCP3208",
        Box::new(|init: &serde_json::Value| Ok(Box::new(adc::SimAdc::new(init)))),
    );
    for kind in ["DHT11", "DHT22", "AM2302"] {
        catalog.register(
            kind,
            Box::new(move |_: &serde_json::Value| Ok(Box::new(dht::SimDht::new(kind)))),
        );
    }
    catalog.register(
        "DS18B20",
        Box::new(|init: &serde_json::Value| Ok(Box::new(probe::SimProbe::new(init)))),
    );
    catalog
}

/// Small deterministic oscillation (period 24 steps) added to base values
/// so consecutive readings differ without drifting.
pub(crate) fn wobble(step: u64, amplitude: f64) -> f64 {
    let index = f64::from(u8::try_from(step % 24).unwrap_or(0));
    (index / 24.0 * std::f64::consts::TAU).sin() * amplitude
}
