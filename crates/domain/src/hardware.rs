//! Hardware is one physical IC instance (GPIO bank, ADC, port expander,
//! probe, …) exposed to sensors and switches through a driver.

use serde::{Deserialize, Serialize};

use crate::id::HardwareId;
use crate::mode::HardwareMode;
use crate::time::Timestamp;

/// One row of `tb_hardware`.
///
/// `kind` is the driver tag resolved through the factory catalog
/// (`"RPI3"`, `"MCP23017"`, `"MCP3208"`, `"DHT22"`, `"DS18B20"`, …);
/// `init` is the raw JSON payload handed to the driver constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hardware {
    pub id: HardwareId,
    pub name: String,
    pub mode: HardwareMode,
    pub kind: String,
    pub init: String,
    pub updated_on: Option<Timestamp>,
}
