//! Log sink port: the persistent trail of readings, actuations and
//! controller messages.

use async_trait::async_trait;
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::log::{LogEntry, LogKind};

#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one record, returning its row id.
    async fn add_log(&self, entry: LogEntry) -> Result<i64, PwError>;

    /// Append a controller INFO message.
    async fn add_info(&self, text: &str) -> Result<i64, PwError> {
        self.add_log(LogEntry::message(LogKind::Info, text)).await
    }

    /// Append a controller WARNING message.
    async fn add_warning(&self, text: &str) -> Result<i64, PwError> {
        self.add_log(LogEntry::message(LogKind::Warning, text)).await
    }

    /// Append a controller ERROR message.
    async fn add_error(&self, text: &str) -> Result<i64, PwError> {
        self.add_log(LogEntry::message(LogKind::Error, text)).await
    }
}
