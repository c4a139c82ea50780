//! # ponicwatch-app
//!
//! Orchestration core of the ponicwatch supervisor.
//!
//! ## Responsibilities
//! - Define the **ports** (traits) the outside world must implement:
//!   hardware drivers, the entity store, the log sink, the notifier
//! - Build the **entity registry** from the link table in creation order
//! - Run the **trigger scheduler**: a one-second tick that fires entity
//!   jobs on their cron schedules, at most one in flight per job
//! - Route **hardware interrupts** to the callbacks registered per pin and
//!   recover from stuck interrupt lines
//! - Evaluate **guard expressions** against live entity values, failing
//!   closed on any resolution or parse problem
//! - Tie it all together in the **orchestrator**: wiring at startup,
//!   graceful shutdown with exactly-once hardware cleanup
//!
//! ## Dependency rule
//! This crate depends only on `ponicwatch-domain`.
//! It must never import adapter crates; all IO goes through the port traits.

pub mod guard;
pub mod interrupts;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;
