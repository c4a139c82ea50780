//! Entity registry: the in-memory graph of systems, hardware handles and
//! supervised entities, built once at startup from the link table.
//!
//! Construction is a single pass over the links in `(system_id, order)`
//! order, so a hardware handle always exists before the sensors and
//! switches that use it. Missing records and unknown driver kinds abort
//! startup; a malformed per-entity init payload only degrades that entity
//! to inactive and is reported as a warning.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ponicwatch_domain::config::InitConfig;
use ponicwatch_domain::error::{NotFoundError, PwError};
use ponicwatch_domain::hardware::Hardware;
use ponicwatch_domain::id::{HardwareId, InterruptId, SensorId, SwitchId, SystemId};
use ponicwatch_domain::interrupt::Interrupt;
use ponicwatch_domain::link;
use ponicwatch_domain::mode::{HardwareMode, SensorMode, SwitchMode};
use ponicwatch_domain::pin::{Pin, PinDirection};
use ponicwatch_domain::sensor::Sensor;
use ponicwatch_domain::switch::Switch;
use ponicwatch_domain::system::System;
use tokio::sync::{Mutex, RwLock};

use crate::ports::{Driver, DriverCatalog, EntityStore, Reading};

/// One constructed hardware IC: the record plus its live driver, behind a
/// lock that serializes bus access across all entities sharing the chip.
pub struct HardwareHandle {
    record: Hardware,
    driver: Mutex<Box<dyn Driver>>,
    cleaned: AtomicBool,
}

impl HardwareHandle {
    pub(crate) fn new(record: Hardware, driver: Box<dyn Driver>) -> Self {
        Self {
            record,
            driver: Mutex::new(driver),
            cleaned: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn record(&self) -> &Hardware {
        &self.record
    }

    /// Acquire one reading.
    ///
    /// # Errors
    ///
    /// Fails when the hardware mode forbids reads or the driver refuses.
    pub async fn read(&self, pin: Pin, param: Option<&str>) -> Result<Reading, PwError> {
        self.check_readable()?;
        self.driver.lock().await.read(pin, param).await
    }

    /// Acquire an averaged reading over `samples` acquisitions.
    ///
    /// # Errors
    ///
    /// Fails when the hardware mode forbids reads or the driver refuses.
    pub async fn average(
        &self,
        pin: Pin,
        samples: u8,
        param: Option<&str>,
    ) -> Result<Reading, PwError> {
        self.check_readable()?;
        self.driver.lock().await.average(pin, samples, param).await
    }

    /// Drive a pin, returning the value actually applied.
    ///
    /// # Errors
    ///
    /// Fails when the hardware mode forbids writes or the driver refuses.
    pub async fn write(&self, pin: Pin, value: f64) -> Result<f64, PwError> {
        if self.record.mode == HardwareMode::Read {
            return Err(PwError::WriteFailure(format!(
                "{} is read-only",
                self.record.name
            )));
        }
        self.driver.lock().await.write(pin, value).await
    }

    /// Program a pin direction on the chip.
    ///
    /// # Errors
    ///
    /// Propagates the driver's refusal.
    pub async fn set_pin_direction(
        &self,
        pin: Pin,
        direction: PinDirection,
    ) -> Result<(), PwError> {
        self.driver.lock().await.set_pin_direction(pin, direction).await
    }

    /// Whether the chip latches a pending interrupt.
    ///
    /// # Errors
    ///
    /// Propagates the driver's refusal.
    pub async fn interrupt_pending(&self) -> Result<bool, PwError> {
        self.driver.lock().await.interrupt_pending().await
    }

    /// Force-clear latched interrupt state.
    ///
    /// # Errors
    ///
    /// Propagates the driver's refusal.
    pub async fn clear_interrupts(&self) -> Result<(), PwError> {
        self.driver.lock().await.clear_interrupts().await
    }

    /// Release the driver's resources. Idempotent: only the first call
    /// reaches the driver; later calls return `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Propagates the driver's cleanup failure (the handle still counts
    /// as cleaned).
    pub async fn cleanup(&self) -> Result<bool, PwError> {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.driver.lock().await.cleanup().await?;
        Ok(true)
    }

    fn check_readable(&self) -> Result<(), PwError> {
        if self.record.mode == HardwareMode::Write {
            return Err(PwError::ReadFailure(format!(
                "{} is write-only",
                self.record.name
            )));
        }
        Ok(())
    }
}

/// A sensor with its parsed config and mutable last-reading state.
pub struct SensorRuntime {
    pub id: SensorId,
    /// Qualified `system/name`.
    pub name: String,
    pub mode: SensorMode,
    pub config: InitConfig,
    pub hardware: Option<HardwareId>,
    pub record: RwLock<Sensor>,
    degraded: bool,
}

impl SensorRuntime {
    /// Active sensors get scheduled jobs and live guard reads; inactive or
    /// degraded ones never touch hardware.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mode.is_active() && !self.degraded
    }
}

/// A switch with its parsed config and mutable state.
pub struct SwitchRuntime {
    pub id: SwitchId,
    /// Qualified `system/name`.
    pub name: String,
    pub mode: SwitchMode,
    pub config: InitConfig,
    pub hardware: Option<HardwareId>,
    pub record: RwLock<Switch>,
    degraded: bool,
}

impl SwitchRuntime {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mode.is_active() && !self.degraded
    }
}

/// An interrupt with its parsed config. The record itself is immutable at
/// runtime.
pub struct InterruptRuntime {
    pub id: InterruptId,
    /// Qualified `system/name`.
    pub name: String,
    pub config: InitConfig,
    pub hardware: Option<HardwareId>,
    pub record: Interrupt,
    degraded: bool,
}

impl InterruptRuntime {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.degraded
    }
}

/// The constructed entity graph.
#[derive(Default)]
pub struct EntityRegistry {
    systems: HashMap<SystemId, System>,
    hardware: HashMap<HardwareId, Arc<HardwareHandle>>,
    hardware_names: HashMap<String, HardwareId>,
    sensors: HashMap<SensorId, Arc<SensorRuntime>>,
    switches: HashMap<SwitchId, Arc<SwitchRuntime>>,
    interrupts: HashMap<InterruptId, Arc<InterruptRuntime>>,
    /// Wiring order, as encountered in the link pass.
    sensor_order: Vec<SensorId>,
    switch_order: Vec<SwitchId>,
    interrupt_order: Vec<InterruptId>,
    /// Non-fatal construction problems, reported by the orchestrator.
    warnings: Vec<String>,
}

impl EntityRegistry {
    /// Build the registry from the persisted link table.
    ///
    /// # Errors
    ///
    /// Fatal: a link referencing a missing record, an unknown hardware
    /// kind, or a driver constructor failure.
    pub async fn build(
        store: &dyn EntityStore,
        catalog: &DriverCatalog,
    ) -> Result<Self, PwError> {
        let links = link::construction_order(store.load_links().await?);
        let mut registry = Self::default();

        for link in links {
            if !registry.systems.contains_key(&link.system_id) {
                let system =
                    store
                        .load_system(link.system_id)
                        .await?
                        .ok_or_else(|| NotFoundError {
                            entity: "System",
                            id: link.system_id.to_string(),
                        })?;
                registry.systems.insert(link.system_id, system);
            }

            if let Some(id) = link.hardware_id
                && !registry.hardware.contains_key(&id)
            {
                registry.add_hardware(store, catalog, id).await?;
            }
            if let Some(id) = link.sensor_id
                && !registry.sensors.contains_key(&id)
            {
                registry
                    .add_sensor(store, id, link.hardware_id, link.system_id)
                    .await?;
            }
            if let Some(id) = link.switch_id
                && !registry.switches.contains_key(&id)
            {
                registry
                    .add_switch(store, id, link.hardware_id, link.system_id)
                    .await?;
            }
            if let Some(id) = link.interrupt_id
                && !registry.interrupts.contains_key(&id)
            {
                registry
                    .add_interrupt(store, id, link.hardware_id, link.system_id)
                    .await?;
            }
        }
        Ok(registry)
    }

    async fn add_hardware(
        &mut self,
        store: &dyn EntityStore,
        catalog: &DriverCatalog,
        id: HardwareId,
    ) -> Result<(), PwError> {
        let record = store.load_hardware(id).await?.ok_or_else(|| NotFoundError {
            entity: "Hardware",
            id: id.to_string(),
        })?;
        let init = parse_driver_init(&record)?;
        let driver = catalog.create(&record.kind, &init)?;
        tracing::debug!(hardware = %record.name, kind = %record.kind, "hardware attached");
        self.hardware_names.insert(record.name.clone(), id);
        self.hardware
            .insert(id, Arc::new(HardwareHandle::new(record, driver)));
        Ok(())
    }

    async fn add_sensor(
        &mut self,
        store: &dyn EntityStore,
        id: SensorId,
        hardware: Option<HardwareId>,
        system_id: SystemId,
    ) -> Result<(), PwError> {
        let record = store.load_sensor(id).await?.ok_or_else(|| NotFoundError {
            entity: "Sensor",
            id: id.to_string(),
        })?;
        let name = self.entity_name(system_id, &record.name);
        let (config, mut degraded) = self.parse_entity_config(&name, &record.init);
        let mode = record.mode;

        let runtime_active = mode.is_active() && !degraded;
        if runtime_active
            && let Err(err) = self
                .program_direction(hardware, config.pin, PinDirection::Input)
                .await
        {
            self.warnings.push(format!(
                "{name}: cannot program input pin: {err}; degraded to inactive"
            ));
            degraded = true;
        }

        let runtime = Arc::new(SensorRuntime {
            id,
            name,
            mode,
            config,
            hardware,
            record: RwLock::new(record),
            degraded,
        });
        self.sensor_order.push(id);
        self.sensors.insert(id, runtime);
        Ok(())
    }

    async fn add_switch(
        &mut self,
        store: &dyn EntityStore,
        id: SwitchId,
        hardware: Option<HardwareId>,
        system_id: SystemId,
    ) -> Result<(), PwError> {
        let record = store.load_switch(id).await?.ok_or_else(|| NotFoundError {
            entity: "Switch",
            id: id.to_string(),
        })?;
        let name = self.entity_name(system_id, &record.name);
        let (config, mut degraded) = self.parse_entity_config(&name, &record.init);
        let mode = record.mode;

        let runtime_active = mode.is_active() && !degraded;
        if runtime_active
            && let Err(err) = self
                .program_direction(hardware, config.pin, PinDirection::Output)
                .await
        {
            self.warnings.push(format!(
                "{name}: cannot program output pin: {err}; degraded to inactive"
            ));
            degraded = true;
        }

        let runtime = Arc::new(SwitchRuntime {
            id,
            name,
            mode,
            config,
            hardware,
            record: RwLock::new(record),
            degraded,
        });
        self.switch_order.push(id);
        self.switches.insert(id, runtime);
        Ok(())
    }

    async fn add_interrupt(
        &mut self,
        store: &dyn EntityStore,
        id: InterruptId,
        hardware: Option<HardwareId>,
        system_id: SystemId,
    ) -> Result<(), PwError> {
        let record = store.load_interrupt(id).await?.ok_or_else(|| NotFoundError {
            entity: "Interrupt",
            id: id.to_string(),
        })?;
        let name = self.entity_name(system_id, &record.name);
        let (config, degraded) = self.parse_entity_config(&name, &record.init);

        let runtime = Arc::new(InterruptRuntime {
            id,
            name,
            config,
            hardware,
            record,
            degraded,
        });
        self.interrupt_order.push(id);
        self.interrupts.insert(id, runtime);
        Ok(())
    }

    /// Parse an entity init payload, degrading on failure instead of
    /// aborting startup.
    fn parse_entity_config(&mut self, name: &str, init: &str) -> (InitConfig, bool) {
        match InitConfig::parse(init) {
            Ok(config) => (config, false),
            Err(err) => {
                self.warnings
                    .push(format!("{name}: {err}; degraded to inactive"));
                (InitConfig::default(), true)
            }
        }
    }

    /// Program a pin direction when the owning hardware is R/W-capable.
    async fn program_direction(
        &self,
        hardware: Option<HardwareId>,
        pin: Option<Pin>,
        direction: PinDirection,
    ) -> Result<(), PwError> {
        let (Some(id), Some(pin)) = (hardware, pin) else {
            return Ok(());
        };
        let Some(handle) = self.hardware.get(&id) else {
            return Ok(());
        };
        if handle.record.mode == HardwareMode::ReadWrite {
            handle.set_pin_direction(pin, direction).await?;
        }
        Ok(())
    }

    /// Read a sensor through its hardware, honoring the power-control
    /// sequence: power on, settle, acquire (averaged when `samples` is
    /// set), power off. An inactive sensor returns its stored values
    /// without touching hardware.
    ///
    /// # Errors
    ///
    /// Fails when the sensor has no usable hardware or the driver refuses
    /// the read. Power-off is attempted even then.
    pub async fn read_sensor(&self, sensor: &SensorRuntime) -> Result<Reading, PwError> {
        if !sensor.is_active() {
            let record = sensor.record.read().await;
            return Ok(Reading {
                raw: record.read_value,
                computed: record.calculated_value,
            });
        }
        let handle = self.entity_hardware(sensor.hardware, &sensor.name)?;
        // Drivers that address the device through `hw_param` ignore the pin.
        let pin = sensor.config.pin.unwrap_or(Pin::new(0));
        let param = sensor.config.hw_param.as_deref();

        let power = match &sensor.config.power {
            Some(power_ref) => {
                let power_handle =
                    self.hardware_by_name(&power_ref.hardware).ok_or_else(|| {
                        PwError::ReadFailure(format!(
                            "{}: power hardware {:?} not in registry",
                            sensor.name, power_ref.hardware
                        ))
                    })?;
                Some((power_handle, power_ref.pin))
            }
            None => None,
        };

        if let Some((power_handle, power_pin)) = &power {
            power_handle.write(*power_pin, 1.0).await?;
            if sensor.config.power_delay > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(sensor.config.power_delay)).await;
            }
        }

        let result = match sensor.config.samples {
            Some(samples) if samples > 1 => handle.average(pin, samples, param).await,
            _ => handle.read(pin, param).await,
        };

        // Power down whether the acquisition worked or not.
        if let Some((power_handle, power_pin)) = &power
            && let Err(err) = power_handle.write(*power_pin, 0.0).await
        {
            tracing::warn!(sensor = %sensor.name, error = %err, "power-off after read failed");
        }
        result
    }

    /// Drive a switch's pin to a value, returning the value applied.
    ///
    /// # Errors
    ///
    /// Fails when the switch has no usable hardware or the driver refuses.
    pub async fn write_switch(&self, switch: &SwitchRuntime, value: f64) -> Result<f64, PwError> {
        let handle = self.entity_hardware(switch.hardware, &switch.name)?;
        let pin = switch.config.pin.unwrap_or(Pin::new(0));
        handle.write(pin, value).await
    }

    /// Release every hardware handle exactly once, collecting failures
    /// instead of stopping at the first.
    pub async fn cleanup_all(&self) -> Vec<(String, PwError)> {
        let mut failures = Vec::new();
        for handle in self.hardware.values() {
            if let Err(err) = handle.cleanup().await {
                failures.push((handle.record.name.clone(), err));
            }
        }
        failures
    }

    /// Qualified `system/entity` name for an entity living in a system.
    fn entity_name(&self, system_id: SystemId, entity: &str) -> String {
        self.systems.get(&system_id).map_or_else(
            || entity.to_string(),
            |system| system.qualified_name(entity),
        )
    }

    fn entity_hardware(
        &self,
        hardware: Option<HardwareId>,
        name: &str,
    ) -> Result<&Arc<HardwareHandle>, PwError> {
        let id = hardware
            .ok_or_else(|| PwError::ReadFailure(format!("{name}: no hardware linked")))?;
        self.hardware
            .get(&id)
            .ok_or_else(|| PwError::ReadFailure(format!("{name}: hardware {id} not in registry")))
    }

    #[must_use]
    pub fn system(&self, id: SystemId) -> Option<&System> {
        self.systems.get(&id)
    }

    #[must_use]
    pub fn hardware(&self, id: HardwareId) -> Option<&Arc<HardwareHandle>> {
        self.hardware.get(&id)
    }

    #[must_use]
    pub fn hardware_by_name(&self, name: &str) -> Option<&Arc<HardwareHandle>> {
        self.hardware_names.get(name).and_then(|id| self.hardware.get(id))
    }

    #[must_use]
    pub fn sensor(&self, id: SensorId) -> Option<&Arc<SensorRuntime>> {
        self.sensors.get(&id)
    }

    #[must_use]
    pub fn switch(&self, id: SwitchId) -> Option<&Arc<SwitchRuntime>> {
        self.switches.get(&id)
    }

    #[must_use]
    pub fn interrupt(&self, id: InterruptId) -> Option<&Arc<InterruptRuntime>> {
        self.interrupts.get(&id)
    }

    /// Sensors in link order.
    pub fn sensors(&self) -> impl Iterator<Item = &Arc<SensorRuntime>> {
        self.sensor_order.iter().filter_map(|id| self.sensors.get(id))
    }

    /// Switches in link order.
    pub fn switches(&self) -> impl Iterator<Item = &Arc<SwitchRuntime>> {
        self.switch_order.iter().filter_map(|id| self.switches.get(id))
    }

    /// Interrupts in link order.
    pub fn interrupts(&self) -> impl Iterator<Item = &Arc<InterruptRuntime>> {
        self.interrupt_order
            .iter()
            .filter_map(|id| self.interrupts.get(id))
    }

    /// All hardware handles.
    pub fn hardware_handles(&self) -> impl Iterator<Item = &Arc<HardwareHandle>> {
        self.hardware.values()
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Hardware init payloads must parse before the driver sees them; an empty
/// payload stands for an empty object.
fn parse_driver_init(record: &Hardware) -> Result<serde_json::Value, PwError> {
    if record.init.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&record.init).map_err(|err| {
        PwError::Config(ponicwatch_domain::error::ConfigError::new(format!(
            "hardware {} init is not valid JSON: {err}",
            record.name
        )))
    })
}

#[cfg(test)]
mod tests {
    use ponicwatch_domain::id::SystemId;

    use super::*;
    use crate::testing::{MemStore, ScriptLog, script_catalog, sensor_row, switch_row};

    fn store_with_one_of_each() -> MemStore {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "GPIO", HardwareMode::ReadWrite, "SCRIPT", "");
        store.add_sensor(sensor_row(5, "water-temp", r#"{"pin": 4}"#));
        store.add_switch(switch_row(3, "pump", r#"{"pin": 17, "set_value_to": "t"}"#));
        store.link(1, 1, Some(10), None, None, None);
        store.link(1, 2, Some(10), Some(5), None, None);
        store.link(1, 3, Some(10), None, Some(3), None);
        store
    }

    #[tokio::test]
    async fn should_build_registry_from_links() {
        let store = store_with_one_of_each();
        let (catalog, _log) = script_catalog(vec![21.5]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();

        assert!(registry.system(SystemId::new(1)).is_some());
        assert!(registry.hardware(HardwareId::new(10)).is_some());
        let sensor = registry.sensor(SensorId::new(5)).unwrap();
        assert_eq!(sensor.name, "basin-1/water-temp");
        assert!(sensor.is_active());
        assert!(registry.warnings().is_empty());
    }

    #[tokio::test]
    async fn should_skip_inactive_links() {
        let mut store = store_with_one_of_each();
        store.add_sensor(sensor_row(6, "orphan", "{}"));
        // Disabled row: non-positive system id.
        store.link(0, 1, None, Some(6), None, None);

        let (catalog, _log) = script_catalog(vec![]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        assert!(registry.sensor(SensorId::new(6)).is_none());
        assert!(registry.sensor(SensorId::new(5)).is_some());
    }

    #[tokio::test]
    async fn should_fail_on_unknown_hardware_kind() {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "MYSTERY", HardwareMode::Read, "NOPE", "");
        store.link(1, 1, Some(10), None, None, None);

        let (catalog, _log) = script_catalog(vec![]);
        let Err(err) = EntityRegistry::build(&store, &catalog).await else {
            panic!("unknown hardware kind must abort registry construction");
        };
        assert!(matches!(err, PwError::UnknownHardwareKind(_)));
    }

    #[tokio::test]
    async fn should_fail_on_missing_sensor_record() {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.link(1, 1, None, Some(99), None, None);

        let (catalog, _log) = script_catalog(vec![]);
        let Err(err) = EntityRegistry::build(&store, &catalog).await else {
            panic!("missing sensor record must abort registry construction");
        };
        assert!(matches!(err, PwError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_degrade_sensor_with_bad_init() {
        let mut store = store_with_one_of_each();
        store.add_sensor(sensor_row(7, "broken", r#"{"pin": "Z9"}"#));
        store.link(1, 4, None, Some(7), None, None);

        let (catalog, _log) = script_catalog(vec![]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        let sensor = registry.sensor(SensorId::new(7)).unwrap();
        assert!(!sensor.is_active());
        assert_eq!(registry.warnings().len(), 1);
        assert!(registry.warnings()[0].contains("basin-1/broken"));
    }

    #[tokio::test]
    async fn should_create_entity_once_despite_duplicate_links() {
        let mut store = store_with_one_of_each();
        // Second system shares the same hardware handle.
        store.add_system(2, "basin-2");
        store.link(2, 1, Some(10), None, None, None);

        let (catalog, log) = script_catalog(vec![]);
        let _registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        assert_eq!(log.count_ops("construct"), 1);
    }

    #[tokio::test]
    async fn should_program_pin_directions_on_read_write_hardware() {
        let store = store_with_one_of_each();
        let (catalog, log) = script_catalog(vec![]);
        let _registry = EntityRegistry::build(&store, &catalog).await.unwrap();

        let ops = log.ops();
        assert!(ops.contains(&"direction 4 input".to_string()));
        assert!(ops.contains(&"direction 17 output".to_string()));
    }

    #[tokio::test]
    async fn should_power_cycle_around_read() {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "ADC", HardwareMode::Read, "SCRIPT", "");
        store.add_hardware(11, "GPIO", HardwareMode::ReadWrite, "SCRIPT", "");
        store.add_sensor(sensor_row(
            5,
            "ec-probe",
            r#"{"pin": 2, "POWER": "GPIO.12", "power_delay": 0.0}"#,
        ));
        store.link(1, 1, Some(11), None, None, None);
        store.link(1, 2, Some(10), Some(5), None, None);

        let (catalog, log) = script_catalog(vec![1.8]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        let sensor = registry.sensor(SensorId::new(5)).unwrap();
        let reading = registry.read_sensor(sensor).await.unwrap();
        assert!((reading.computed - 1.8).abs() < f64::EPSILON);

        let ops = log.ops();
        let on = ops.iter().position(|op| op == "write 12 1").unwrap();
        let read = ops.iter().position(|op| op == "read 2").unwrap();
        let off = ops.iter().position(|op| op == "write 12 0").unwrap();
        assert!(on < read && read < off);
    }

    #[tokio::test]
    async fn should_power_off_even_when_read_fails() {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "ADC", HardwareMode::Read, "SCRIPT", "");
        store.add_hardware(11, "GPIO", HardwareMode::ReadWrite, "SCRIPT", "");
        store.add_sensor(sensor_row(5, "ec-probe", r#"{"pin": 2, "POWER": "GPIO.12"}"#));
        store.link(1, 1, Some(11), None, None, None);
        store.link(1, 2, Some(10), Some(5), None, None);

        // Empty script: every read fails.
        let (catalog, log) = script_catalog(vec![]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        let sensor = registry.sensor(SensorId::new(5)).unwrap();
        assert!(registry.read_sensor(sensor).await.is_err());
        assert!(log.ops().contains(&"write 12 0".to_string()));
    }

    #[tokio::test]
    async fn should_return_stored_values_for_inactive_sensor() {
        let mut store = store_with_one_of_each();
        let mut row = sensor_row(8, "retired", r#"{"pin": 6}"#);
        row.mode = SensorMode::Inactive;
        row.read_value = 7.0;
        row.calculated_value = 7.5;
        store.add_sensor(row);
        store.link(1, 4, None, Some(8), None, None);

        let (catalog, log) = script_catalog(vec![99.0]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        let sensor = registry.sensor(SensorId::new(8)).unwrap();
        let reading = registry.read_sensor(sensor).await.unwrap();
        assert!((reading.computed - 7.5).abs() < f64::EPSILON);
        assert_eq!(log.count_ops("read"), 0);
    }

    #[tokio::test]
    async fn should_cleanup_each_handle_exactly_once() {
        let store = store_with_one_of_each();
        let (catalog, log) = script_catalog(vec![]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();

        assert!(registry.cleanup_all().await.is_empty());
        assert!(registry.cleanup_all().await.is_empty());
        assert_eq!(log.count_ops("cleanup"), 1);
    }

    #[tokio::test]
    async fn should_refuse_write_on_read_only_hardware() {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "ADC", HardwareMode::Read, "SCRIPT", "");
        store.add_switch(switch_row(3, "pump", r#"{"pin": 1}"#));
        store.link(1, 1, Some(10), None, Some(3), None);

        let (catalog, _log) = script_catalog(vec![]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        let switch = registry.switch(SwitchId::new(3)).unwrap();
        let err = registry.write_switch(switch, 1.0).await.unwrap_err();
        assert!(matches!(err, PwError::WriteFailure(_)));
    }

    #[tokio::test]
    async fn should_average_when_samples_configured() {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "ADC", HardwareMode::Read, "SCRIPT", "");
        store.add_sensor(sensor_row(5, "ph-probe", r#"{"pin": 0, "samples": 2}"#));
        store.link(1, 1, Some(10), Some(5), None, None);

        let (catalog, log) = script_catalog(vec![6.0, 7.0]);
        let registry = EntityRegistry::build(&store, &catalog).await.unwrap();
        let sensor = registry.sensor(SensorId::new(5)).unwrap();
        let reading = registry.read_sensor(sensor).await.unwrap();
        assert!((reading.computed - 6.5).abs() < f64::EPSILON);
        assert_eq!(log.count_ops("read"), 2);
    }
}
