//! # ponicwatch-domain
//!
//! Pure domain model for the ponicwatch supervisor.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **entity records** tracked by the registry: Systems,
//!   Hardware ICs, Sensors, Switches, Interrupts
//! - Define the **link graph** rows that associate entities with systems in
//!   creation order
//! - Define **pin descriptors** (plain, hex, or bank-relative tokens)
//! - Define **cron specs** (six fields, seconds resolution) and their
//!   matching rules
//! - Define **guard expressions**: a restricted comparison/boolean grammar
//!   evaluated over substituted entity values, never a general evaluator
//! - Define the **log record** shapes written by the supervised entities
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod config;
pub mod cron;
pub mod expression;
pub mod hardware;
pub mod interrupt;
pub mod link;
pub mod log;
pub mod mode;
pub mod pin;
pub mod sensor;
pub mod switch;
pub mod system;
