//! jobgrid.toml configuration parser.
//!
//! Carries the node-wide placement policy as an explicit configuration
//! value: the policy is read from config and threaded into every packing
//! call rather than living in a process-wide global.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Packing granularity for the whole node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Reserve individual hardware threads (the default).
    #[default]
    Threads,
    /// Reserve whole cores — every thread of a core goes to its task.
    Cores,
}

/// Placement engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub policy: PlacementPolicy,
}

/// Top-level node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub placement: PlacementConfig,
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
