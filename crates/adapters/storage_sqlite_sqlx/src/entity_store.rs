//! `SQLite` implementation of the `EntityStore` port.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use ponicwatch_app::ports::EntityStore;
use ponicwatch_domain::error::{NotFoundError, PwError};
use ponicwatch_domain::hardware::Hardware;
use ponicwatch_domain::id::{HardwareId, InterruptId, SensorId, SwitchId, SystemId};
use ponicwatch_domain::interrupt::Interrupt;
use ponicwatch_domain::link::LinkRecord;
use ponicwatch_domain::mode::{HardwareMode, SensorMode, SwitchMode};
use ponicwatch_domain::sensor::Sensor;
use ponicwatch_domain::switch::Switch;
use ponicwatch_domain::system::System;
use ponicwatch_domain::time::Timestamp;

use crate::error::StorageError;

/// Decode an integer mode column, rejecting codes the domain does not know.
fn decode_mode<T>(code: i64, decode: fn(i64) -> Option<T>, column: &str) -> Result<T, sqlx::Error> {
    decode(code).ok_or_else(|| sqlx::Error::Decode(format!("invalid {column} code {code}").into()))
}

/// Decode an optional RFC 3339 timestamp column.
pub(crate) fn decode_timestamp(value: Option<String>) -> Result<Option<Timestamp>, sqlx::Error> {
    value
        .map(|text| {
            chrono::DateTime::parse_from_rfc3339(&text)
                .map(|at| at.to_utc())
                .map_err(|err| sqlx::Error::Decode(Box::new(err)))
        })
        .transpose()
}

/// Wrappers for converting database rows into domain records without
/// polluting the domain structs with database concerns.
struct SystemWrapper(System);

impl<'r> FromRow<'r, SqliteRow> for SystemWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(System {
            id: SystemId::new(row.try_get("system_id")?),
            name: row.try_get("name")?,
            location: row.try_get("location")?,
            sys_type: row.try_get("sys_type")?,
            nb_plants: row.try_get("nb_plants")?,
        }))
    }
}

struct HardwareWrapper(Hardware);

impl<'r> FromRow<'r, SqliteRow> for HardwareWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Hardware {
            id: HardwareId::new(row.try_get("hardware_id")?),
            name: row.try_get("name")?,
            mode: decode_mode(row.try_get("mode")?, HardwareMode::from_code, "hardware mode")?,
            kind: row.try_get("hardware")?,
            init: row.try_get("init")?,
            updated_on: decode_timestamp(row.try_get("updated_on")?)?,
        }))
    }
}

struct SensorWrapper(Sensor);

impl<'r> FromRow<'r, SqliteRow> for SensorWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Sensor {
            id: SensorId::new(row.try_get("sensor_id")?),
            name: row.try_get("name")?,
            mode: decode_mode(row.try_get("mode")?, SensorMode::from_code, "sensor mode")?,
            init: row.try_get("init")?,
            timer: row.try_get("timer")?,
            read_value: row.try_get("read_value")?,
            calculated_value: row.try_get("calculated_value")?,
            timestamp_value: decode_timestamp(row.try_get("timestamp_value")?)?,
            updated_on: decode_timestamp(row.try_get("updated_on")?)?,
        }))
    }
}

struct SwitchWrapper(Switch);

impl<'r> FromRow<'r, SqliteRow> for SwitchWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Switch {
            id: SwitchId::new(row.try_get("switch_id")?),
            name: row.try_get("name")?,
            mode: decode_mode(row.try_get("mode")?, SwitchMode::from_code, "switch mode")?,
            init: row.try_get("init")?,
            timer: row.try_get("timer")?,
            value: row.try_get("value")?,
            updated_on: decode_timestamp(row.try_get("updated_on")?)?,
        }))
    }
}

struct InterruptWrapper(Interrupt);

impl<'r> FromRow<'r, SqliteRow> for InterruptWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Interrupt {
            id: InterruptId::new(row.try_get("interrupt_id")?),
            name: row.try_get("name")?,
            init: row.try_get("init")?,
            timer: row.try_get("timer")?,
            threshold: row.try_get("threshold")?,
            updated_on: decode_timestamp(row.try_get("updated_on")?)?,
        }))
    }
}

struct LinkWrapper(LinkRecord);

impl<'r> FromRow<'r, SqliteRow> for LinkWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(LinkRecord {
            system_id: SystemId::new(row.try_get("system_id")?),
            sensor_id: row.try_get::<Option<i64>, _>("sensor_id")?.map(SensorId::new),
            switch_id: row.try_get::<Option<i64>, _>("switch_id")?.map(SwitchId::new),
            hardware_id: row
                .try_get::<Option<i64>, _>("hardware_id")?
                .map(HardwareId::new),
            interrupt_id: row
                .try_get::<Option<i64>, _>("interrupt_id")?
                .map(InterruptId::new),
            order: row.try_get("link_order")?,
        }))
    }
}

const SELECT_LINKS: &str = r"
    SELECT system_id, sensor_id, switch_id, hardware_id, interrupt_id, link_order
    FROM tb_link
";
const SELECT_SYSTEM: &str = "SELECT * FROM tb_system WHERE system_id = ?";
const SELECT_HARDWARE: &str = "SELECT * FROM tb_hardware WHERE hardware_id = ?";
const SELECT_SENSOR: &str = "SELECT * FROM tb_sensor WHERE sensor_id = ?";
const SELECT_SWITCH: &str = "SELECT * FROM tb_switch WHERE switch_id = ?";
const SELECT_INTERRUPT: &str = "SELECT * FROM tb_interrupt WHERE interrupt_id = ?";

const UPDATE_SENSOR_VALUES: &str = r"
    UPDATE tb_sensor
    SET read_value = ?, calculated_value = ?, timestamp_value = ?, updated_on = ?
    WHERE sensor_id = ?
";

const UPDATE_SWITCH_VALUE: &str = r"
    UPDATE tb_switch
    SET value = ?, updated_on = ?
    WHERE switch_id = ?
";

/// `SQLite`-backed entity store.
pub struct SqliteEntityStore {
    pool: SqlitePool,
}

impl SqliteEntityStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn load_links(&self) -> Result<Vec<LinkRecord>, PwError> {
        let rows: Vec<LinkWrapper> = sqlx::query_as(SELECT_LINKS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn load_system(&self, id: SystemId) -> Result<Option<System>, PwError> {
        let row: Option<SystemWrapper> = sqlx::query_as(SELECT_SYSTEM)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn load_hardware(&self, id: HardwareId) -> Result<Option<Hardware>, PwError> {
        let row: Option<HardwareWrapper> = sqlx::query_as(SELECT_HARDWARE)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn load_sensor(&self, id: SensorId) -> Result<Option<Sensor>, PwError> {
        let row: Option<SensorWrapper> = sqlx::query_as(SELECT_SENSOR)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn load_switch(&self, id: SwitchId) -> Result<Option<Switch>, PwError> {
        let row: Option<SwitchWrapper> = sqlx::query_as(SELECT_SWITCH)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn load_interrupt(&self, id: InterruptId) -> Result<Option<Interrupt>, PwError> {
        let row: Option<InterruptWrapper> = sqlx::query_as(SELECT_INTERRUPT)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn save_sensor_reading(
        &self,
        id: SensorId,
        raw: f64,
        computed: f64,
        at: Timestamp,
    ) -> Result<(), PwError> {
        let result = sqlx::query(UPDATE_SENSOR_VALUES)
            .bind(raw)
            .bind(computed)
            .bind(at.to_rfc3339())
            .bind(at.to_rfc3339())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Sensor",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn save_switch_value(
        &self,
        id: SwitchId,
        value: f64,
        at: Timestamp,
    ) -> Result<(), PwError> {
        let result = sqlx::query(UPDATE_SWITCH_VALUE)
            .bind(value)
            .bind(at.to_rfc3339())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Switch",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
