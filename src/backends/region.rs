//! Point-of-presence to region selection.

use std::collections::HashMap;

use crate::config::schema::RegionTableConfig;

/// Static lookup from edge location code to logical backend region.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    table: HashMap<String, String>,
    default_region: String,
}

impl RegionSelector {
    pub fn new(config: &RegionTableConfig, default_region: impl Into<String>) -> Self {
        Self {
            table: config
                .pops
                .iter()
                .map(|(pop, region)| (pop.to_ascii_uppercase(), region.clone()))
                .collect(),
            default_region: default_region.into(),
        }
    }

    /// Region for a PoP code; unknown or missing codes get the default region.
    pub fn select_region(&self, pop: Option<&str>) -> &str {
        pop.and_then(|code| self.table.get(&code.to_ascii_uppercase()))
            .map(String::as_str)
            .unwrap_or(&self.default_region)
    }
}
