//! Notifier port: out-of-band alerts (interrupt actions, fatal conditions).

use async_trait::async_trait;
use ponicwatch_domain::error::PwError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification. `attachments` are paths to files to bundle
    /// with the message; delivery failures must not take the process down,
    /// so callers log and continue on error.
    async fn notify(
        &self,
        subject: &str,
        html_body: &str,
        attachments: &[String],
    ) -> Result<(), PwError>;
}
