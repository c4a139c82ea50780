//! Link records: the rows that associate entities with systems.
//!
//! Registry construction is a single left-to-right pass over links sorted by
//! `(system_id, order)`. The ordering matters: a sensor/switch/interrupt link
//! may reference a hardware id that must already exist in the registry.

use serde::{Deserialize, Serialize};

use crate::id::{HardwareId, InterruptId, SensorId, SwitchId, SystemId};

/// One row of the link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub system_id: SystemId,
    pub sensor_id: Option<SensorId>,
    pub switch_id: Option<SwitchId>,
    pub hardware_id: Option<HardwareId>,
    pub interrupt_id: Option<InterruptId>,
    /// Creation-order hint within the system.
    pub order: i64,
}

impl LinkRecord {
    /// Links with a non-positive system id are disabled rows; the registry
    /// skips them entirely.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.system_id.as_i64() > 0
    }

    /// Sort key for the construction pass.
    #[must_use]
    pub fn sort_key(&self) -> (SystemId, i64) {
        (self.system_id, self.order)
    }
}

/// Sort links into registry construction order, dropping inactive rows.
#[must_use]
pub fn construction_order(mut links: Vec<LinkRecord>) -> Vec<LinkRecord> {
    links.retain(LinkRecord::is_active);
    links.sort_by_key(LinkRecord::sort_key);
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(system: i64, order: i64) -> LinkRecord {
        LinkRecord {
            system_id: SystemId::new(system),
            sensor_id: None,
            switch_id: None,
            hardware_id: None,
            interrupt_id: None,
            order,
        }
    }

    #[test]
    fn should_mark_non_positive_system_as_inactive() {
        assert!(!link(0, 1).is_active());
        assert!(!link(-3, 1).is_active());
        assert!(link(1, 1).is_active());
    }

    #[test]
    fn should_sort_by_system_then_order() {
        let links = vec![link(2, 1), link(1, 2), link(1, 1)];
        let sorted = construction_order(links);
        assert_eq!(
            sorted.iter().map(LinkRecord::sort_key).collect::<Vec<_>>(),
            vec![
                (SystemId::new(1), 1),
                (SystemId::new(1), 2),
                (SystemId::new(2), 1)
            ]
        );
    }

    #[test]
    fn should_drop_inactive_links_when_ordering() {
        let links = vec![link(1, 1), link(0, 2), link(-1, 3)];
        let sorted = construction_order(links);
        assert_eq!(sorted.len(), 1);
    }
}
