//! jobgrid-core — shared domain types for the JobGrid node placement core.
//!
//! Holds the types that cross crate boundaries:
//!
//! - **`types`** — node topology descriptions (the narrow interface to the
//!   hardware discovery collaborator)
//! - **`request`** — per-task resource requests and job requirement groups
//! - **`quantity`** — byte-suffixed memory quantity parsing
//! - **`config`** — placement policy and node configuration (TOML)
//!
//! This crate never mutates placement state; the engine lives in
//! `jobgrid-placement`.

pub mod config;
pub mod error;
pub mod quantity;
pub mod request;
pub mod types;

pub use config::{NodeConfig, PlacementConfig, PlacementPolicy};
pub use error::{QuantityError, RequestError};
pub use quantity::parse_memory_kb;
pub use request::{JobRequest, TaskGroup, TaskRequest, LPROCS, MEMORY};
pub use types::*;
