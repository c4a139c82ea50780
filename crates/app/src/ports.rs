//! Ports: the traits adapters implement to plug into the orchestration core.

pub mod driver;
pub mod log_sink;
pub mod notifier;
pub mod store;

pub use driver::{Driver, DriverCatalog, DriverFactory, Reading};
pub use log_sink::LogSink;
pub use notifier::Notifier;
pub use store::EntityStore;
