//! Interrupt router: fan-out of hardware pin events to the callbacks the
//! orchestrator registered, plus recovery from stuck interrupt lines.
//!
//! The hardware side (a GPIO edge watcher, a simulator, a test) calls
//! [`InterruptRouter::dispatch`] with the pin and the level it observed;
//! the router runs every callback registered for that pin in registration
//! order. A pin nobody registered for is a silent no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ponicwatch_domain::error::PwError;
use ponicwatch_domain::pin::Pin;
use ponicwatch_domain::time::Timestamp;
use tokio::sync::Mutex;

use crate::registry::HardwareHandle;
use crate::scheduler::JobFuture;

/// Callback invoked with the observed pin level and the event instant.
pub type InterruptCallback = Arc<dyn Fn(i64, Timestamp) -> JobFuture + Send + Sync>;

#[derive(Default)]
pub struct InterruptRouter {
    callbacks: Mutex<HashMap<Pin, Vec<InterruptCallback>>>,
}

impl InterruptRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to a pin's fan-out list.
    pub async fn register(&self, pin: Pin, callback: InterruptCallback) {
        self.callbacks
            .lock()
            .await
            .entry(pin)
            .or_default()
            .push(callback);
    }

    /// Number of callbacks registered for a pin.
    pub async fn callback_count(&self, pin: Pin) -> usize {
        self.callbacks
            .lock()
            .await
            .get(&pin)
            .map_or(0, Vec::len)
    }

    /// Run every callback registered for the pin, in registration order.
    pub async fn dispatch(&self, pin: Pin, level: i64, at: Timestamp) {
        let callbacks = self
            .callbacks
            .lock()
            .await
            .get(&pin)
            .cloned()
            .unwrap_or_default();
        if callbacks.is_empty() {
            tracing::debug!(pin = pin.number(), level, "interrupt on unregistered pin, ignored");
            return;
        }
        tracing::debug!(pin = pin.number(), level, callbacks = callbacks.len(), "interrupt dispatched");
        for callback in callbacks {
            // Each callback runs on its own task so a panic in one cannot
            // take down the rest of the fan-out.
            if tokio::spawn(callback(level, at)).await.is_err() {
                tracing::warn!(pin = pin.number(), level, "interrupt callback panicked");
            }
        }
    }

    /// Detect and recover a stuck interrupt line on an expander-style chip.
    ///
    /// A latched interrupt normally clears as soon as its port is read. If
    /// the chip still reports a pending interrupt after three re-checks
    /// half a second apart, the latch is force-cleared so the line can fire
    /// again. Returns whether a forced clear was needed; the caller reports
    /// it as a degraded condition.
    ///
    /// # Errors
    ///
    /// Propagates driver failures from the pending checks or the clear.
    pub async fn clear_stuck(&self, handle: &HardwareHandle) -> Result<bool, PwError> {
        if !handle.interrupt_pending().await? {
            return Ok(false);
        }
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if !handle.interrupt_pending().await? {
                return Ok(false);
            }
        }
        handle.clear_interrupts().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use ponicwatch_domain::hardware::Hardware;
    use ponicwatch_domain::id::HardwareId;
    use ponicwatch_domain::mode::HardwareMode;
    use ponicwatch_domain::time;

    use super::*;
    use crate::testing::script_catalog;

    fn recording_callback(trace: &Arc<Mutex<Vec<String>>>, tag: &str) -> InterruptCallback {
        let trace = Arc::clone(trace);
        let tag = tag.to_string();
        Arc::new(move |level, _at| {
            let trace = Arc::clone(&trace);
            let tag = tag.clone();
            Box::pin(async move {
                trace.lock().await.push(format!("{tag}:{level}"));
            })
        })
    }

    #[tokio::test]
    async fn should_fan_out_in_registration_order() {
        let router = InterruptRouter::new();
        let trace = Arc::new(Mutex::new(Vec::new()));
        router.register(Pin::new(9), recording_callback(&trace, "first")).await;
        router.register(Pin::new(9), recording_callback(&trace, "second")).await;

        router.dispatch(Pin::new(9), 1, time::now()).await;
        assert_eq!(*trace.lock().await, vec!["first:1", "second:1"]);
    }

    #[tokio::test]
    async fn should_run_remaining_callbacks_when_one_panics() {
        let router = InterruptRouter::new();
        let trace = Arc::new(Mutex::new(Vec::new()));
        let misbehaving: InterruptCallback =
            Arc::new(|_, _| Box::pin(async { panic!("callback blew up") }));
        router.register(Pin::new(9), misbehaving).await;
        router.register(Pin::new(9), recording_callback(&trace, "after")).await;

        router.dispatch(Pin::new(9), 1, time::now()).await;
        assert_eq!(*trace.lock().await, vec!["after:1"]);
    }

    #[tokio::test]
    async fn should_ignore_unregistered_pin() {
        let router = InterruptRouter::new();
        let trace = Arc::new(Mutex::new(Vec::new()));
        router.register(Pin::new(9), recording_callback(&trace, "only")).await;

        router.dispatch(Pin::new(4), 1, time::now()).await;
        assert!(trace.lock().await.is_empty());
    }

    fn script_handle() -> (HardwareHandle, crate::testing::ScriptLog) {
        let (catalog, log) = script_catalog(vec![]);
        let driver = catalog.create("SCRIPT", &serde_json::json!({})).unwrap();
        let record = Hardware {
            id: HardwareId::new(1),
            name: "EXPANDER".to_string(),
            mode: HardwareMode::ReadWrite,
            kind: "SCRIPT".to_string(),
            init: String::new(),
            updated_on: None,
        };
        (HardwareHandle::new(record, driver), log)
    }

    #[tokio::test(start_paused = true)]
    async fn should_leave_transient_interrupt_alone() {
        let router = InterruptRouter::new();
        let (handle, log) = script_handle();
        log.set_pending(vec![true, false]);

        let forced = router.clear_stuck(&handle).await.unwrap();
        assert!(!forced);
        assert_eq!(log.count_ops("clear"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_force_clear_stuck_interrupt() {
        let router = InterruptRouter::new();
        let (handle, log) = script_handle();
        log.set_pending(vec![true, true, true, true]);

        let forced = router.clear_stuck(&handle).await.unwrap();
        assert!(forced);
        assert_eq!(log.count_ops("clear"), 1);
    }

    #[tokio::test]
    async fn should_skip_recovery_when_nothing_pending() {
        let router = InterruptRouter::new();
        let (handle, log) = script_handle();

        let forced = router.clear_stuck(&handle).await.unwrap();
        assert!(!forced);
        assert_eq!(log.count_ops("clear"), 0);
    }
}
