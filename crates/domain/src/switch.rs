//! Switch is a scheduled actuation of one hardware pin (pump, light, fan,
//! relay, …), optionally gated by a guard expression.

use serde::{Deserialize, Serialize};

use crate::config::Target;
use crate::id::SwitchId;
use crate::mode::SwitchMode;
use crate::time::Timestamp;

/// One row of `tb_switch`. `value` is the current state, boolean-coded
/// (0.0 = off, 1.0 = on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub id: SwitchId,
    pub name: String,
    pub mode: SwitchMode,
    /// Raw JSON init payload (pin, set_value_to, if, …).
    pub init: String,
    /// One or more six-field cron specs, separated by `;`.
    pub timer: Option<String>,
    pub value: f64,
    pub updated_on: Option<Timestamp>,
}

impl Switch {
    /// The value a toggle would produce: `new = 1 - old` for boolean-coded
    /// switches, so two toggles restore the original state.
    #[must_use]
    pub fn toggled(&self) -> f64 {
        if self.value >= 0.5 { 0.0 } else { 1.0 }
    }

    /// Resolve a target against the current state.
    #[must_use]
    pub fn resolve_target(&self, target: Target) -> f64 {
        match target {
            Target::Toggle => self.toggled(),
            Target::Level(level) => level,
        }
    }

    /// Record a new state.
    pub fn apply_value(&mut self, value: f64, at: Timestamp) {
        self.value = value;
        self.updated_on = Some(at);
    }

    /// The individual schedule strings of the `timer` column.
    #[must_use]
    pub fn schedules(&self) -> Vec<&str> {
        self.timer
            .as_deref()
            .map(|t| t.split(';').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}
