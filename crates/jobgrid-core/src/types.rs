//! Node topology descriptions.
//!
//! These types are the narrow interface to the hardware discovery
//! collaborator: whatever enumerates the node (hwloc, /sys, a test fixture,
//! a TOML file) hands the placement engine one of these descriptions and is
//! never consulted again. All types are serializable so a description can be
//! captured to disk and replayed.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identifier of a job holding reservations, e.g. `"1437.napali"`.
/// Opaque to this core; equality is exact string match.
pub type JobId = String;

/// Node-wide hardware classification, used only to select NUMA-aware vs.
/// flat initialization.
///
/// On Intel-style hardware NUMA nodes sit below sockets; on AMD-style
/// hardware the nesting is inverted. Either way each NUMA node becomes one
/// placement chip. Non-NUMA hardware gets one pseudo-chip per socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareStyle {
    NonNuma,
    Intel,
    Amd,
}

impl HardwareStyle {
    pub fn is_numa(&self) -> bool {
        !matches!(self, HardwareStyle::NonNuma)
    }
}

/// One physical core as reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreTopology {
    /// Number of hardware threads this core exposes.
    pub threads: u32,
}

/// One NUMA node as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipTopology {
    /// Local memory in kilobytes.
    pub memory_kb: u64,
    /// Physical cores, in discovery order.
    pub cores: Vec<CoreTopology>,
}

impl ChipTopology {
    /// A chip with `cores` identical cores of `threads_per_core` threads.
    pub fn uniform(cores: u32, threads_per_core: u32, memory_kb: u64) -> Self {
        ChipTopology {
            memory_kb,
            cores: vec![
                CoreTopology {
                    threads: threads_per_core,
                };
                cores as usize
            ],
        }
    }
}

/// One socket as reported by discovery.
///
/// NUMA hardware populates `numa_nodes`; non-NUMA hardware leaves it empty
/// and reports the socket-wide memory and cores directly, from which a
/// single pseudo-chip spanning the socket is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketTopology {
    /// NUMA nodes in this socket, in discovery order. Empty on non-NUMA
    /// hardware.
    #[serde(default)]
    pub numa_nodes: Vec<ChipTopology>,
    /// Socket-wide memory in kilobytes (non-NUMA hardware only).
    #[serde(default)]
    pub memory_kb: u64,
    /// Socket-wide cores (non-NUMA hardware only).
    #[serde(default)]
    pub cores: Vec<CoreTopology>,
}

/// The whole node as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTopology {
    pub style: HardwareStyle,
    /// Sockets, in discovery order.
    pub sockets: Vec<SocketTopology>,
}

impl NodeTopology {
    /// Load a captured topology description from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let topology: NodeTopology = toml::from_str(&content)?;
        Ok(topology)
    }
}
