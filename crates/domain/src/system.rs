//! System is a monitored installation (hydroponic basin, grow tent,
//! the ambient atmosphere, …) that groups sensors and switches.

use serde::{Deserialize, Serialize};

use crate::id::SystemId;

/// One row of `tb_system`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    pub name: String,
    /// Where the system is installed.
    pub location: Option<String>,
    /// NFT, aeroponic, ebb-and-flow, …
    pub sys_type: Option<String>,
    pub nb_plants: i64,
}

impl System {
    /// Qualified name prefix for entities belonging to this system,
    /// e.g. `"basin-1/water-temp"`.
    #[must_use]
    pub fn qualified_name(&self, entity_name: &str) -> String {
        format!("{}/{}", self.name, entity_name)
    }
}
