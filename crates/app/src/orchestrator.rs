//! Orchestrator: builds the registry, wires every active entity to the
//! trigger scheduler and the interrupt router, applies forced startup
//! states, and owns the shutdown sequence.
//!
//! Job bodies never propagate errors. A failed read, write or guard is
//! logged through the sink and the job ends; the scheduler keeps firing
//! the others.

use std::sync::Arc;
use std::time::Duration;

use ponicwatch_domain::config::InterruptAction;
use ponicwatch_domain::cron::CronSpec;
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::id::{SensorId, SwitchId};
use ponicwatch_domain::log::{LogEntry, LogKind};
use ponicwatch_domain::mode::SwitchMode;
use ponicwatch_domain::time;

use crate::guard;
use crate::interrupts::{InterruptCallback, InterruptRouter};
use crate::ports::{DriverCatalog, EntityStore, LogSink, Notifier};
use crate::registry::{EntityRegistry, InterruptRuntime, SensorRuntime, SwitchRuntime};
use crate::scheduler::{JobFn, TriggerScheduler};

/// Cron spec of the stuck-interrupt sweep, wired only when at least one
/// pin-bound interrupt exists.
const INTERRUPT_SWEEP_SPEC: &str = "*/30 * * * * *";

pub struct Orchestrator {
    registry: Arc<EntityRegistry>,
    scheduler: TriggerScheduler,
    router: Arc<InterruptRouter>,
    store: Arc<dyn EntityStore>,
    log: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    /// Build the registry and wire every active entity.
    ///
    /// # Errors
    ///
    /// Propagates fatal registry construction failures (missing records,
    /// unknown hardware kinds, driver constructor errors).
    pub async fn build(
        store: Arc<dyn EntityStore>,
        catalog: &DriverCatalog,
        log: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PwError> {
        let registry = Arc::new(EntityRegistry::build(store.as_ref(), catalog).await?);
        for warning in registry.warnings() {
            tracing::warn!("{warning}");
            note_sink_failure(log.add_warning(warning).await);
        }

        let mut orchestrator = Self {
            registry,
            scheduler: TriggerScheduler::new(),
            router: Arc::new(InterruptRouter::new()),
            store,
            log,
            notifier,
        };
        orchestrator.wire_sensors().await;
        orchestrator.wire_switches().await;
        orchestrator.wire_interrupts().await;
        Ok(orchestrator)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// The router hardware event sources dispatch into.
    #[must_use]
    pub fn router(&self) -> Arc<InterruptRouter> {
        Arc::clone(&self.router)
    }

    #[must_use]
    pub fn job_count(&self) -> usize {
        self.scheduler.job_count()
    }

    /// Apply forced startup states and start the tick loop.
    pub async fn start(&mut self) {
        for switch in self.registry.switches() {
            if !switch.is_active() {
                continue;
            }
            let forced = match switch.mode {
                SwitchMode::On => 1.0,
                SwitchMode::Off => 0.0,
                SwitchMode::Inactive | SwitchMode::Auto => continue,
            };
            tracing::info!(switch = %switch.name, value = forced, "applying forced startup state");
            apply_switch_value(
                &self.registry,
                switch,
                self.store.as_ref(),
                self.log.as_ref(),
                forced,
            )
            .await;
        }
        self.scheduler.start();
        note_sink_failure(self.log.add_info("controller started").await);
        tracing::info!(jobs = self.scheduler.job_count(), "supervisor running");
    }

    /// Run one sensor's job immediately, outside its schedule.
    pub async fn run_sensor(&self, id: SensorId) {
        if let Some(sensor) = self.registry.sensor(id) {
            run_sensor_job(
                &self.registry,
                sensor,
                self.store.as_ref(),
                self.log.as_ref(),
            )
            .await;
        }
    }

    /// Run one switch's job immediately, outside its schedule.
    pub async fn run_switch(&self, id: SwitchId) {
        if let Some(switch) = self.registry.switch(id) {
            run_switch_job(
                &self.registry,
                switch,
                self.store.as_ref(),
                self.log.as_ref(),
            )
            .await;
        }
    }

    /// Stop the scheduler, drain in-flight jobs up to `grace`, then release
    /// every hardware handle exactly once.
    pub async fn shutdown(mut self, grace: Duration) {
        tracing::info!("shutdown requested");
        if !self.scheduler.stop(grace).await {
            tracing::warn!("jobs still in flight after the grace period");
            note_sink_failure(
                self.log
                    .add_warning("jobs still in flight at shutdown")
                    .await,
            );
        }
        for (name, err) in self.registry.cleanup_all().await {
            tracing::error!(hardware = %name, error = %err, "hardware cleanup failed");
            note_sink_failure(
                self.log
                    .add_error(&format!("cleanup of {name} failed: {err}"))
                    .await,
            );
        }
        note_sink_failure(self.log.add_info("controller stopped").await);
        tracing::info!("supervisor stopped");
    }

    async fn wire_sensors(&mut self) {
        let mut jobs = Vec::new();
        for sensor in self.registry.sensors() {
            if !sensor.is_active() {
                continue;
            }
            let schedules = owned_schedules(&sensor.record.read().await.schedules());
            let specs = self.parse_schedules(&sensor.name, &schedules).await;
            if specs.is_empty() {
                continue;
            }
            let registry = Arc::clone(&self.registry);
            let sensor = Arc::clone(sensor);
            let store = Arc::clone(&self.store);
            let log = Arc::clone(&self.log);
            let name = sensor.name.clone();
            let run: JobFn = Arc::new(move || {
                let registry = Arc::clone(&registry);
                let sensor = Arc::clone(&sensor);
                let store = Arc::clone(&store);
                let log = Arc::clone(&log);
                Box::pin(async move {
                    run_sensor_job(&registry, &sensor, store.as_ref(), log.as_ref()).await;
                })
            });
            jobs.push((name, specs, run));
        }
        for (name, specs, run) in jobs {
            self.scheduler.add_jobs(name, specs, run);
        }
    }

    async fn wire_switches(&mut self) {
        let mut jobs = Vec::new();
        for switch in self.registry.switches() {
            // Only Auto switches are scheduler-driven; On/Off are forced
            // startup states.
            if !switch.is_active() || switch.mode != SwitchMode::Auto {
                continue;
            }
            let schedules = owned_schedules(&switch.record.read().await.schedules());
            let specs = self.parse_schedules(&switch.name, &schedules).await;
            if specs.is_empty() {
                continue;
            }
            let registry = Arc::clone(&self.registry);
            let switch = Arc::clone(switch);
            let store = Arc::clone(&self.store);
            let log = Arc::clone(&self.log);
            let name = switch.name.clone();
            let run: JobFn = Arc::new(move || {
                let registry = Arc::clone(&registry);
                let switch = Arc::clone(&switch);
                let store = Arc::clone(&store);
                let log = Arc::clone(&log);
                Box::pin(async move {
                    run_switch_job(&registry, &switch, store.as_ref(), log.as_ref()).await;
                })
            });
            jobs.push((name, specs, run));
        }
        for (name, specs, run) in jobs {
            self.scheduler.add_jobs(name, specs, run);
        }
    }

    async fn wire_interrupts(&mut self) {
        let mut pin_bound = false;
        let mut jobs = Vec::new();
        for interrupt in self.registry.interrupts() {
            if !interrupt.is_active() {
                continue;
            }
            if let (Some(pin), Some(_)) = (interrupt.config.pin, interrupt.hardware) {
                pin_bound = true;
                let callback = interrupt_callback(
                    Arc::clone(interrupt),
                    Arc::clone(&self.log),
                    Arc::clone(&self.notifier),
                );
                self.router.register(pin, callback).await;
            }
            if let Some(timer) = interrupt.record.timer.clone() {
                let schedules = owned_schedules(
                    &timer
                        .split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>(),
                );
                let specs = self.parse_schedules(&interrupt.name, &schedules).await;
                if specs.is_empty() {
                    continue;
                }
                let interrupt = Arc::clone(interrupt);
                let log = Arc::clone(&self.log);
                let notifier = Arc::clone(&self.notifier);
                let name = interrupt.name.clone();
                let run: JobFn = Arc::new(move || {
                    let interrupt = Arc::clone(&interrupt);
                    let log = Arc::clone(&log);
                    let notifier = Arc::clone(&notifier);
                    Box::pin(async move {
                        let level = interrupt.record.threshold;
                        run_interrupt_action(&interrupt, level, log.as_ref(), notifier.as_ref())
                            .await;
                    })
                });
                jobs.push((name, specs, run));
            }
        }
        for (name, specs, run) in jobs {
            self.scheduler.add_jobs(name, specs, run);
        }

        if pin_bound && let Ok(spec) = INTERRUPT_SWEEP_SPEC.parse::<CronSpec>() {
            let registry = Arc::clone(&self.registry);
            let router = Arc::clone(&self.router);
            let log = Arc::clone(&self.log);
            let run: JobFn = Arc::new(move || {
                let registry = Arc::clone(&registry);
                let router = Arc::clone(&router);
                let log = Arc::clone(&log);
                Box::pin(async move {
                    sweep_handles(&registry, &router, log.as_ref()).await;
                })
            });
            self.scheduler.add_job("interrupt-recovery", spec, run);
        }
    }

    /// Parse an entity's schedule strings; a malformed spec is reported and
    /// dropped so the job never fires on it.
    async fn parse_schedules(&self, name: &str, schedules: &[String]) -> Vec<CronSpec> {
        let mut specs = Vec::new();
        for schedule in schedules {
            match schedule.parse::<CronSpec>() {
                Ok(spec) => specs.push(spec),
                Err(err) => {
                    tracing::warn!(entity = %name, schedule = %schedule, error = %err, "bad schedule, dropped");
                    note_sink_failure(
                        self.log
                            .add_warning(&format!("{name}: bad schedule {schedule:?}: {err}"))
                            .await,
                    );
                }
            }
        }
        specs
    }
}

fn owned_schedules(schedules: &[&str]) -> Vec<String> {
    schedules.iter().map(ToString::to_string).collect()
}

fn interrupt_callback(
    interrupt: Arc<InterruptRuntime>,
    log: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
) -> InterruptCallback {
    Arc::new(move |level, _at| {
        let interrupt = Arc::clone(&interrupt);
        let log = Arc::clone(&log);
        let notifier = Arc::clone(&notifier);
        Box::pin(async move {
            if interrupt.record.is_triggered_by(level) {
                run_interrupt_action(&interrupt, level, log.as_ref(), notifier.as_ref()).await;
            } else {
                tracing::debug!(interrupt = %interrupt.name, level, "level off threshold, ignored");
            }
        })
    })
}

/// One scheduled sensor acquisition: read, update the record, persist,
/// append a snapshot log entry.
pub(crate) async fn run_sensor_job(
    registry: &EntityRegistry,
    sensor: &SensorRuntime,
    store: &dyn EntityStore,
    log: &dyn LogSink,
) {
    match registry.read_sensor(sensor).await {
        Ok(reading) => {
            let at = time::now();
            let snapshot = {
                let mut record = sensor.record.write().await;
                record.apply_reading(reading.raw, reading.computed, at);
                serde_json::to_string(&*record).unwrap_or_default()
            };
            tracing::debug!(sensor = %sensor.name, raw = reading.raw, computed = reading.computed, "sensor read");
            if let Err(err) = store
                .save_sensor_reading(sensor.id, reading.raw, reading.computed, at)
                .await
            {
                tracing::error!(sensor = %sensor.name, error = %err, "reading not persisted");
            }
            note_sink_failure(
                log.add_log(LogEntry::snapshot(
                    LogKind::Sensor,
                    sensor.id.as_i64(),
                    &sensor.name,
                    reading.computed,
                    snapshot,
                ))
                .await,
            );
        }
        Err(err) => {
            tracing::error!(sensor = %sensor.name, error = %err, "sensor read failed");
            note_sink_failure(
                log.add_error(&format!("cannot read {}: {err}", sensor.name))
                    .await,
            );
        }
    }
}

/// One scheduled switch actuation: evaluate the guard (fail closed),
/// resolve the target against the current state, drive the pin, persist.
pub(crate) async fn run_switch_job(
    registry: &EntityRegistry,
    switch: &SwitchRuntime,
    store: &dyn EntityStore,
    log: &dyn LogSink,
) {
    if let Some(guard_source) = &switch.config.guard {
        match guard::evaluate(registry, guard_source).await {
            Ok(true) => {
                tracing::debug!(switch = %switch.name, "guard passed, armed");
            }
            Ok(false) => {
                tracing::debug!(switch = %switch.name, "guard failed, skipped");
                return;
            }
            Err(err) => {
                tracing::warn!(switch = %switch.name, error = %err, "guard not evaluable, skipped");
                note_sink_failure(
                    log.add_warning(&format!(
                        "{}: guard not evaluable ({err}), actuation skipped",
                        switch.name
                    ))
                    .await,
                );
                return;
            }
        }
    }
    let Some(target) = switch.config.set_value_to else {
        tracing::warn!(switch = %switch.name, "no set_value_to configured, nothing to apply");
        return;
    };
    let desired = switch.record.read().await.resolve_target(target);
    apply_switch_value(registry, switch, store, log, desired).await;
}

async fn apply_switch_value(
    registry: &EntityRegistry,
    switch: &SwitchRuntime,
    store: &dyn EntityStore,
    log: &dyn LogSink,
    desired: f64,
) {
    match registry.write_switch(switch, desired).await {
        Ok(applied) => {
            let at = time::now();
            let snapshot = {
                let mut record = switch.record.write().await;
                record.apply_value(applied, at);
                serde_json::to_string(&*record).unwrap_or_default()
            };
            tracing::debug!(switch = %switch.name, value = applied, "switch set");
            if let Err(err) = store.save_switch_value(switch.id, applied, at).await {
                tracing::error!(switch = %switch.name, error = %err, "state not persisted");
            }
            note_sink_failure(
                log.add_log(LogEntry::snapshot(
                    LogKind::Switch,
                    switch.id.as_i64(),
                    &switch.name,
                    applied,
                    snapshot,
                ))
                .await,
            );
        }
        Err(err) => {
            tracing::error!(switch = %switch.name, error = %err, "switch write failed");
            note_sink_failure(
                log.add_error(&format!("cannot set {}: {err}", switch.name))
                    .await,
            );
        }
    }
}

async fn run_interrupt_action(
    interrupt: &InterruptRuntime,
    level: i64,
    log: &dyn LogSink,
    notifier: &dyn Notifier,
) {
    let text = format!("interrupt {} raised (level {level})", interrupt.name);
    tracing::info!("{text}");
    if interrupt.config.action == InterruptAction::Notify
        && let Err(err) = notifier
            .notify(&format!("ponicwatch: {}", interrupt.name), &text, &[])
            .await
    {
        tracing::error!(interrupt = %interrupt.name, error = %err, "notification failed");
        note_sink_failure(
            log.add_error(&format!("notification for {} failed: {err}", interrupt.name))
                .await,
        );
    }
    note_sink_failure(log.add_info(&text).await);
}

async fn sweep_handles(registry: &EntityRegistry, router: &InterruptRouter, log: &dyn LogSink) {
    for handle in registry.hardware_handles() {
        match router.clear_stuck(handle).await {
            Ok(false) => {}
            Ok(true) => {
                let text = format!(
                    "stuck interrupt line on {} force-cleared",
                    handle.record().name
                );
                tracing::warn!("{text}");
                note_sink_failure(log.add_warning(&text).await);
            }
            Err(err) => {
                tracing::error!(hardware = %handle.record().name, error = %err, "interrupt sweep failed");
            }
        }
    }
}

/// Log sink failures must never take a job down; they only reach the trace
/// output.
fn note_sink_failure<T>(result: Result<T, PwError>) {
    if let Err(err) = result {
        tracing::error!(error = %err, "log sink failure");
    }
}
