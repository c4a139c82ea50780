//! Typed identifier newtypes backed by integer record ids.
//!
//! Every entity row carries a stable integer key assigned by the persistence
//! layer. References between entities are expressed through these ids and
//! resolved via the registry, never through raw pointers.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw record id.
            #[must_use]
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Access the inner record id.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`System`](crate::system::System).
    SystemId
);

define_id!(
    /// Unique identifier for a [`Hardware`](crate::hardware::Hardware) IC.
    HardwareId
);

define_id!(
    /// Unique identifier for a [`Sensor`](crate::sensor::Sensor).
    SensorId
);

define_id!(
    /// Unique identifier for a [`Switch`](crate::switch::Switch).
    SwitchId
);

define_id!(
    /// Unique identifier for an [`Interrupt`](crate::interrupt::Interrupt).
    InterruptId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_through_display_and_from_str() {
        let id = SensorId::new(42);
        let text = id.to_string();
        let parsed: SensorId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_serialize_as_plain_integer() {
        let id = HardwareId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let parsed: HardwareId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_return_error_when_parsing_non_integer() {
        let result: Result<SwitchId, _> = "not-a-number".parse();
        assert!(result.is_err());
    }

    #[test]
    fn should_order_by_inner_value() {
        assert!(SystemId::new(1) < SystemId::new(2));
    }
}
