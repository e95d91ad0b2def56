//! jobgrid-placement — the node-local resource placement engine.
//!
//! Decides exactly which hardware is reserved for each task of a job on one
//! node, and releases those reservations exactly. The hierarchy mirrors the
//! hardware: a [`Machine`] owns sockets, each [`Socket`] owns one or more
//! [`Chip`]s (NUMA nodes, or whole-socket pseudo-chips on flat hardware),
//! each [`Chip`] owns [`Core`]s, and each core owns its hardware threads.
//!
//! The chip is the packing unit: it answers "how many tasks of this shape
//! fit" and performs the reservation, at whole-core or per-thread
//! granularity depending on the configured [`PlacementPolicy`]. The machine
//! orchestrates a job across chips, consolidating onto as few chips as
//! possible, and renders the final affinity mapping as range strings via
//! `jobgrid-rangeset`.
//!
//! All state is in-memory and mutated synchronously through `&mut self`;
//! the surrounding node service serializes placement and release for a
//! node. Releases are idempotent and never fail for unknown job ids.
//!
//! [`PlacementPolicy`]: jobgrid_core::PlacementPolicy

pub mod allocation;
pub mod chip;
pub mod core;
pub mod error;
pub mod machine;

pub use allocation::Allocation;
pub use chip::Chip;
pub use error::{PlacementError, PlacementResult};
pub use machine::{Machine, PlacedJob, Socket};
pub use self::core::Core;
