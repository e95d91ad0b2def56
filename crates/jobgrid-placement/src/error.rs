//! Placement engine error types.

use thiserror::Error;

/// Result type alias for placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Errors that can occur while building a machine or placing a job.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The topology collaborator reported something a chip or core cannot
    /// be built from. Fatal for that component, never retried.
    #[error("invalid topology: {0}")]
    Topology(String),

    /// A reservation targeted a thread that is already owned. The caller
    /// (chip) is responsible for never over-allocating, so this indicates
    /// corrupted bookkeeping.
    #[error("thread {thread} on core {core} is already owned by job {owner}")]
    ThreadAlreadyOwned {
        core: u64,
        thread: u64,
        owner: String,
    },

    /// A reservation targeted a thread index the core does not have.
    #[error("core {core} has no thread at index {index}")]
    NoSuchThread { core: u64, index: usize },

    /// A chip's free-unit scan came up short of what its own fit check
    /// promised. Indicates corrupted bookkeeping.
    #[error("chip {chip} ran out of free processing units while reserving for job {job_id}")]
    OutOfUnits { chip: u64, job_id: String },

    /// The node cannot hold the job. Partial reservations made before the
    /// shortfall remain in place; roll back with
    /// [`Machine::free_job_allocation`](crate::Machine::free_job_allocation).
    #[error(
        "insufficient capacity for job {job_id}: {unplaced} of {requested} tasks \
         in group {group} could not be placed"
    )]
    InsufficientCapacity {
        job_id: String,
        group: usize,
        requested: u32,
        unplaced: u32,
    },
}
