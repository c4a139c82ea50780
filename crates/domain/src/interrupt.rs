//! Interrupt is a callback bound either to a hardware pin edge or to a
//! timer, executing an action tag (notify, log) when triggered.

use serde::{Deserialize, Serialize};

use crate::id::InterruptId;
use crate::time::Timestamp;

/// One row of `tb_interrupt`.
///
/// A pin-bound interrupt (link carries a hardware id, init carries a pin)
/// registers a router callback; a timer-bound interrupt (no hardware,
/// `timer` set) gets a plain scheduled job instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interrupt {
    pub id: InterruptId,
    pub name: String,
    /// Raw JSON init payload (pin, action, …).
    pub init: String,
    /// Six-field cron spec for timer-bound interrupts.
    pub timer: Option<String>,
    /// Trigger threshold: pin level that counts as "raised".
    pub threshold: i64,
    pub updated_on: Option<Timestamp>,
}

impl Interrupt {
    /// Whether the given pin level satisfies the trigger threshold.
    #[must_use]
    pub fn is_triggered_by(&self, level: i64) -> bool {
        level == self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_trigger_only_on_threshold_level() {
        let interrupt = Interrupt {
            id: InterruptId::new(1),
            name: "float-low".to_string(),
            init: r#"{"pin": "B1", "action": "notify"}"#.to_string(),
            timer: None,
            threshold: 1,
            updated_on: None,
        };
        assert!(interrupt.is_triggered_by(1));
        assert!(!interrupt.is_triggered_by(0));
    }
}
