//! Entity store port.
//!
//! The registry reads the persisted entity rows through this trait at
//! startup and writes fresh values back after each job. Loads return
//! `Option` so the caller decides whether a missing row is fatal.

use async_trait::async_trait;
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::hardware::Hardware;
use ponicwatch_domain::id::{HardwareId, InterruptId, SensorId, SwitchId, SystemId};
use ponicwatch_domain::interrupt::Interrupt;
use ponicwatch_domain::link::LinkRecord;
use ponicwatch_domain::sensor::Sensor;
use ponicwatch_domain::switch::Switch;
use ponicwatch_domain::system::System;
use ponicwatch_domain::time::Timestamp;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// All link rows, active or not. The registry sorts and filters them.
    async fn load_links(&self) -> Result<Vec<LinkRecord>, PwError>;

    async fn load_system(&self, id: SystemId) -> Result<Option<System>, PwError>;

    async fn load_hardware(&self, id: HardwareId) -> Result<Option<Hardware>, PwError>;

    async fn load_sensor(&self, id: SensorId) -> Result<Option<Sensor>, PwError>;

    async fn load_switch(&self, id: SwitchId) -> Result<Option<Switch>, PwError>;

    async fn load_interrupt(&self, id: InterruptId) -> Result<Option<Interrupt>, PwError>;

    /// Persist a sensor reading (raw + computed + timestamp).
    async fn save_sensor_reading(
        &self,
        id: SensorId,
        raw: f64,
        computed: f64,
        at: Timestamp,
    ) -> Result<(), PwError>;

    /// Persist a switch state.
    async fn save_switch_value(&self, id: SwitchId, value: f64, at: Timestamp)
    -> Result<(), PwError>;
}
