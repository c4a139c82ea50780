//! Guard evaluation: resolve a guard's entity references to live values,
//! substitute them into the expression text, parse and evaluate.
//!
//! Guards fail closed. An unresolved reference, a read failure or a
//! malformed expression is an error the caller logs and treats as
//! guard-false; a switch never actuates on a broken guard.

use std::collections::HashMap;

use ponicwatch_domain::error::PwError;
use ponicwatch_domain::expression::{EntityKind, Expression, GuardSource};
use ponicwatch_domain::id::{SensorId, SwitchId};
use ponicwatch_domain::time;

use crate::registry::EntityRegistry;

/// Evaluate a guard against the registry.
///
/// Sensor references force a fresh hardware read so the decision is made
/// on current values; switch references use the stored state.
///
/// # Errors
///
/// [`PwError::UnresolvedReference`] when a referenced entity is not in the
/// registry, a read failure when a referenced sensor cannot be acquired,
/// [`PwError::Expression`] when the substituted text does not parse or
/// does not evaluate to a boolean.
pub async fn evaluate(registry: &EntityRegistry, guard: &GuardSource) -> Result<bool, PwError> {
    let mut values = HashMap::new();
    for reference in guard.references() {
        let value = match reference.kind {
            EntityKind::Sensor => {
                let sensor = registry
                    .sensor(SensorId::new(reference.id))
                    .ok_or_else(|| PwError::UnresolvedReference(reference.to_string()))?;
                registry.read_sensor(sensor).await?.computed
            }
            EntityKind::Switch => {
                let switch = registry
                    .switch(SwitchId::new(reference.id))
                    .ok_or_else(|| PwError::UnresolvedReference(reference.to_string()))?;
                switch.record.read().await.value
            }
        };
        values.insert(reference, value);
    }
    let source = guard.substitute(&values, time::now())?;
    let expression = Expression::parse(&source)?;
    Ok(expression.eval_bool()?)
}

#[cfg(test)]
mod tests {
    use ponicwatch_domain::mode::HardwareMode;
    use serde_json::json;

    use super::*;
    use crate::registry::EntityRegistry as Registry;
    use crate::testing::{MemStore, script_catalog, sensor_row, switch_row};

    async fn registry_with_script(readings: Vec<f64>) -> (Registry, crate::testing::ScriptLog) {
        let mut store = MemStore::new();
        store.add_system(1, "basin-1");
        store.add_hardware(10, "ADC", HardwareMode::Read, "SCRIPT", "");
        store.add_sensor(sensor_row(2, "humidity", r#"{"pin": 3}"#));
        let mut pump = switch_row(4, "pump", r#"{"pin": 1}"#);
        pump.value = 1.0;
        store.add_switch(pump);
        store.link(1, 1, Some(10), Some(2), None, None);
        store.link(1, 2, None, None, Some(4), None);

        let (catalog, log) = script_catalog(readings);
        let registry = Registry::build(&store, &catalog).await.unwrap();
        (registry, log)
    }

    fn guard(value: serde_json::Value) -> GuardSource {
        GuardSource::from_json(&value).unwrap()
    }

    #[tokio::test]
    async fn should_pass_when_live_value_satisfies_comparison() {
        let (registry, _log) = registry_with_script(vec![41.0]).await;
        let guard = guard(json!("Sensor[2]>=40.0"));
        assert!(evaluate(&registry, &guard).await.unwrap());
    }

    #[tokio::test]
    async fn should_fail_when_live_value_misses_threshold() {
        let (registry, _log) = registry_with_script(vec![39.0]).await;
        let guard = guard(json!("Sensor[2]>=40.0"));
        assert!(!evaluate(&registry, &guard).await.unwrap());
    }

    #[tokio::test]
    async fn should_force_a_fresh_sensor_read() {
        let (registry, log) = registry_with_script(vec![41.0]).await;
        let guard = guard(json!("Sensor[2]>=40.0"));
        evaluate(&registry, &guard).await.unwrap();
        assert_eq!(log.count_ops("read"), 1);
    }

    #[tokio::test]
    async fn should_resolve_template_guard_with_switch_state() {
        let (registry, _log) = registry_with_script(vec![31.0]).await;
        let guard = guard(json!(["{}>30 and {}==1", "Sensor[2]", "Switch[4]"]));
        assert!(evaluate(&registry, &guard).await.unwrap());
    }

    #[tokio::test]
    async fn should_error_on_unresolved_reference() {
        let (registry, _log) = registry_with_script(vec![]).await;
        let guard = guard(json!("Sensor[99]>0"));
        let err = evaluate(&registry, &guard).await.unwrap_err();
        assert!(matches!(err, PwError::UnresolvedReference(_)));
    }

    #[tokio::test]
    async fn should_error_on_malformed_expression() {
        let (registry, _log) = registry_with_script(vec![41.0]).await;
        let guard = guard(json!("Sensor[2] >= >= 40"));
        let err = evaluate(&registry, &guard).await.unwrap_err();
        assert!(matches!(err, PwError::Expression(_)));
    }

    #[tokio::test]
    async fn should_propagate_failed_guard_read() {
        // Script exhausted: the forced read fails, the guard must error
        // rather than fall back to a stale value.
        let (registry, _log) = registry_with_script(vec![]).await;
        let guard = guard(json!("Sensor[2]>=40.0"));
        assert!(evaluate(&registry, &guard).await.is_err());
    }
}
