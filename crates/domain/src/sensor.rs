//! Sensor is a scheduled reading of one hardware pin or channel.

use serde::{Deserialize, Serialize};

use crate::id::SensorId;
use crate::mode::SensorMode;
use crate::time::Timestamp;

/// One row of `tb_sensor`.
///
/// `read_value` is the last raw reading (always a float, even for digital
/// inputs); `calculated_value` is the conversion into the expected metric.
/// When the IC itself returns engineering units the two are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub mode: SensorMode,
    /// Raw JSON init payload (pin, hw_param, POWER, samples, …).
    pub init: String,
    /// One or more six-field cron specs, separated by `;`.
    pub timer: Option<String>,
    pub read_value: f64,
    pub calculated_value: f64,
    /// When the last reading was taken.
    pub timestamp_value: Option<Timestamp>,
    pub updated_on: Option<Timestamp>,
}

impl Sensor {
    /// Record a fresh reading.
    pub fn apply_reading(&mut self, raw: f64, computed: f64, at: Timestamp) {
        self.read_value = raw;
        self.calculated_value = computed;
        self.timestamp_value = Some(at);
        self.updated_on = Some(at);
    }

    /// The individual schedule strings of the `timer` column.
    #[must_use]
    pub fn schedules(&self) -> Vec<&str> {
        self.timer
            .as_deref()
            .map(|t| t.split(';').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}
