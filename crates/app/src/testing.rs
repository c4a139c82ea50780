//! In-memory doubles shared by the unit tests: an entity store over plain
//! maps, a scripted driver that records every chip operation, a recording
//! log sink and notifier.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::hardware::Hardware;
use ponicwatch_domain::id::{HardwareId, InterruptId, SensorId, SwitchId, SystemId};
use ponicwatch_domain::interrupt::Interrupt;
use ponicwatch_domain::link::LinkRecord;
use ponicwatch_domain::log::{LogEntry, LogKind};
use ponicwatch_domain::mode::{HardwareMode, SensorMode, SwitchMode};
use ponicwatch_domain::pin::{Pin, PinDirection};
use ponicwatch_domain::sensor::Sensor;
use ponicwatch_domain::switch::Switch;
use ponicwatch_domain::system::System;
use ponicwatch_domain::time::Timestamp;

use crate::ports::{Driver, DriverCatalog, EntityStore, LogSink, Notifier, Reading};

pub fn sensor_row(id: i64, name: &str, init: &str) -> Sensor {
    Sensor {
        id: SensorId::new(id),
        name: name.to_string(),
        mode: SensorMode::Direct,
        init: init.to_string(),
        timer: None,
        read_value: 0.0,
        calculated_value: 0.0,
        timestamp_value: None,
        updated_on: None,
    }
}

pub fn switch_row(id: i64, name: &str, init: &str) -> Switch {
    Switch {
        id: SwitchId::new(id),
        name: name.to_string(),
        mode: SwitchMode::Auto,
        init: init.to_string(),
        timer: None,
        value: 0.0,
        updated_on: None,
    }
}

pub fn interrupt_row(id: i64, name: &str, init: &str, threshold: i64) -> Interrupt {
    Interrupt {
        id: InterruptId::new(id),
        name: name.to_string(),
        init: init.to_string(),
        timer: None,
        threshold,
        updated_on: None,
    }
}

/// Entity store over plain maps, recording every save.
#[derive(Default)]
pub struct MemStore {
    links: Vec<LinkRecord>,
    systems: HashMap<SystemId, System>,
    hardware: HashMap<HardwareId, Hardware>,
    sensors: HashMap<SensorId, Sensor>,
    switches: HashMap<SwitchId, Switch>,
    interrupts: HashMap<InterruptId, Interrupt>,
    pub saved_sensor_values: Mutex<Vec<(SensorId, f64, f64)>>,
    pub saved_switch_values: Mutex<Vec<(SwitchId, f64)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_system(&mut self, id: i64, name: &str) {
        self.systems.insert(
            SystemId::new(id),
            System {
                id: SystemId::new(id),
                name: name.to_string(),
                location: None,
                sys_type: None,
                nb_plants: 0,
            },
        );
    }

    pub fn add_hardware(&mut self, id: i64, name: &str, mode: HardwareMode, kind: &str, init: &str) {
        self.hardware.insert(
            HardwareId::new(id),
            Hardware {
                id: HardwareId::new(id),
                name: name.to_string(),
                mode,
                kind: kind.to_string(),
                init: init.to_string(),
                updated_on: None,
            },
        );
    }

    pub fn add_sensor(&mut self, row: Sensor) {
        self.sensors.insert(row.id, row);
    }

    pub fn add_switch(&mut self, row: Switch) {
        self.switches.insert(row.id, row);
    }

    pub fn add_interrupt(&mut self, row: Interrupt) {
        self.interrupts.insert(row.id, row);
    }

    pub fn link(
        &mut self,
        system: i64,
        order: i64,
        hardware: Option<i64>,
        sensor: Option<i64>,
        switch: Option<i64>,
        interrupt: Option<i64>,
    ) {
        self.links.push(LinkRecord {
            system_id: SystemId::new(system),
            sensor_id: sensor.map(SensorId::new),
            switch_id: switch.map(SwitchId::new),
            hardware_id: hardware.map(HardwareId::new),
            interrupt_id: interrupt.map(InterruptId::new),
            order,
        });
    }
}

#[async_trait]
impl EntityStore for MemStore {
    async fn load_links(&self) -> Result<Vec<LinkRecord>, PwError> {
        Ok(self.links.clone())
    }

    async fn load_system(&self, id: SystemId) -> Result<Option<System>, PwError> {
        Ok(self.systems.get(&id).cloned())
    }

    async fn load_hardware(&self, id: HardwareId) -> Result<Option<Hardware>, PwError> {
        Ok(self.hardware.get(&id).cloned())
    }

    async fn load_sensor(&self, id: SensorId) -> Result<Option<Sensor>, PwError> {
        Ok(self.sensors.get(&id).cloned())
    }

    async fn load_switch(&self, id: SwitchId) -> Result<Option<Switch>, PwError> {
        Ok(self.switches.get(&id).cloned())
    }

    async fn load_interrupt(&self, id: InterruptId) -> Result<Option<Interrupt>, PwError> {
        Ok(self.interrupts.get(&id).cloned())
    }

    async fn save_sensor_reading(
        &self,
        id: SensorId,
        raw: f64,
        computed: f64,
        _at: Timestamp,
    ) -> Result<(), PwError> {
        self.saved_sensor_values.lock().unwrap().push((id, raw, computed));
        Ok(())
    }

    async fn save_switch_value(
        &self,
        id: SwitchId,
        value: f64,
        _at: Timestamp,
    ) -> Result<(), PwError> {
        self.saved_switch_values.lock().unwrap().push((id, value));
        Ok(())
    }
}

#[derive(Default)]
struct ScriptInner {
    ops: Vec<String>,
    readings: VecDeque<f64>,
    pending: VecDeque<bool>,
}

/// Shared recorder behind every scripted driver instance: chip operations
/// in call order, plus the queue of values the next reads return.
#[derive(Clone, Default)]
pub struct ScriptLog(Arc<Mutex<ScriptInner>>);

impl ScriptLog {
    pub fn ops(&self) -> Vec<String> {
        self.0.lock().unwrap().ops.clone()
    }

    pub fn count_ops(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter(|op| op.starts_with(prefix))
            .count()
    }

    pub fn push_reading(&self, value: f64) {
        self.0.lock().unwrap().readings.push_back(value);
    }

    /// Queue the answers the next `interrupt_pending` calls return.
    pub fn set_pending(&self, states: Vec<bool>) {
        self.0.lock().unwrap().pending = states.into();
    }

    fn record(&self, op: String) {
        self.0.lock().unwrap().ops.push(op);
    }
}

/// Driver whose reads pop a scripted value queue and whose every operation
/// lands in the shared [`ScriptLog`].
pub struct ScriptDriver {
    log: ScriptLog,
}

#[async_trait]
impl Driver for ScriptDriver {
    fn kind(&self) -> &'static str {
        "SCRIPT"
    }

    async fn read(&mut self, pin: Pin, _param: Option<&str>) -> Result<Reading, PwError> {
        self.log.record(format!("read {}", pin.number()));
        let value = self
            .log
            .0
            .lock()
            .unwrap()
            .readings
            .pop_front()
            .ok_or_else(|| PwError::ReadFailure("script exhausted".to_string()))?;
        Ok(Reading {
            raw: value,
            computed: value,
        })
    }

    async fn write(&mut self, pin: Pin, value: f64) -> Result<f64, PwError> {
        self.log.record(format!("write {} {}", pin.number(), value));
        Ok(value)
    }

    async fn average(
        &mut self,
        pin: Pin,
        samples: u8,
        param: Option<&str>,
    ) -> Result<Reading, PwError> {
        // No pacing pause in tests.
        let samples = samples.max(1);
        let mut raw = 0.0;
        let mut computed = 0.0;
        for _ in 0..samples {
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

    async fn set_pin_direction(
        &mut self,
        pin: Pin,
        direction: PinDirection,
    ) -> Result<(), PwError> {
        let direction = match direction {
            PinDirection::Input => "input",
            PinDirection::Output => "output",
        };
        self.log.record(format!("direction {} {direction}", pin.number()));
        Ok(())
    }

    async fn interrupt_pending(&mut self) -> Result<bool, PwError> {
        Ok(self.log.0.lock().unwrap().pending.pop_front().unwrap_or(false))
    }

    async fn clear_interrupts(&mut self) -> Result<(), PwError> {
        self.log.record("clear".to_string());
        self.log.0.lock().unwrap().pending.clear();
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<(), PwError> {
        self.log.record("cleanup".to_string());
        Ok(())
    }
}

/// Catalog holding only the `"SCRIPT"` driver kind, seeded with the given
/// reading script.
pub fn script_catalog(readings: Vec<f64>) -> (DriverCatalog, ScriptLog) {
    let log = ScriptLog::default();
    for value in readings {
        log.push_reading(value);
    }
    let mut catalog = DriverCatalog::new();
    let factory_log = log.clone();
    catalog.register(
        "SCRIPT",
        Box::new(move |_init| {
            factory_log.record("construct".to_string());
            Ok(Box::new(ScriptDriver {
                log: factory_log.clone(),
            }))
        }),
    );
    (catalog, log)
}

/// Log sink that keeps every entry in memory.
#[derive(Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLog {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.text_value).collect()
    }

    pub fn count_kind(&self, kind: LogKind) -> usize {
        self.entries().iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl LogSink for RecordingLog {
    async fn add_log(&self, entry: LogEntry) -> Result<i64, PwError> {
        let mut entries = self.entries.lock().unwrap();
        entries.push(entry);
        Ok(i64::try_from(entries.len()).unwrap_or(i64::MAX))
    }
}

/// Notifier that keeps every delivery in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|(subject, _)| subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        subject: &str,
        html_body: &str,
        _attachments: &[String],
    ) -> Result<(), PwError> {
        self.notifications
            .lock()
            .unwrap()
            .push((subject.to_string(), html_body.to_string()));
        Ok(())
    }
}
