//! Per-task resource requests.
//!
//! A [`TaskRequest`] is the placement engine's view of one task's resource
//! needs: a named-value map filled in by the generic attribute framework,
//! of which this core consumes exactly two keys — [`LPROCS`] and
//! [`MEMORY`]. Unrecognized keys are retained but ignored. Absence of a key
//! means "unconstrained" for that dimension, not zero.
//!
//! Values are validated when they are set, so the typed accessors the
//! packing hot path calls are infallible reads.

use std::collections::BTreeMap;

use crate::error::RequestError;
use crate::quantity::parse_memory_kb;
use crate::types::JobId;

/// Logical processors requested per task (integer).
pub const LPROCS: &str = "lprocs";

/// Memory requested per task (byte-suffixed quantity, e.g. `"1kb"`).
pub const MEMORY: &str = "memory";

/// One task's resource needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRequest {
    values: BTreeMap<String, String>,
    lprocs: Option<u64>,
    memory_kb: Option<u64>,
}

impl TaskRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named resource value.
    ///
    /// Recognized keys are validated here; anything else is stored verbatim
    /// and never consulted by the placement engine.
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<(), RequestError> {
        match name {
            LPROCS => {
                self.lprocs =
                    Some(value.trim().parse().map_err(|_| RequestError::InvalidCount {
                        name: name.to_string(),
                        value: value.to_string(),
                    })?);
            }
            MEMORY => {
                self.memory_kb = Some(parse_memory_kb(value)?);
            }
            _ => {}
        }
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Raw named value, as handed over by the attribute framework.
    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Logical processors per task; `None` means unconstrained.
    pub fn lprocs(&self) -> Option<u64> {
        self.lprocs
    }

    /// Memory per task in kilobytes; `None` means unconstrained.
    pub fn memory_kb(&self) -> Option<u64> {
        self.memory_kb
    }
}

/// One homogeneous group of tasks within a job.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    pub request: TaskRequest,
    /// Tasks of this shape needed on this node.
    pub task_count: u32,
}

/// A job's full per-node requirement: one or more task groups, possibly of
/// different shapes.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: JobId,
    pub groups: Vec<TaskGroup>,
}

impl JobRequest {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        JobRequest {
            job_id: job_id.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, request: TaskRequest, task_count: u32) -> Self {
        self.groups.push(TaskGroup {
            request,
            task_count,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> TaskRequest {
        let mut r = TaskRequest::new();
        r.set_value(LPROCS, "2").unwrap();
        r.set_value(MEMORY, "1kb").unwrap();
        r
    }

    #[test]
    fn recognized_keys_parse() {
        let r = sample_request();
        assert_eq!(r.lprocs(), Some(2));
        assert_eq!(r.memory_kb(), Some(1));
    }

    #[test]
    fn absent_keys_are_unconstrained() {
        let r = TaskRequest::new();
        assert_eq!(r.lprocs(), None);
        assert_eq!(r.memory_kb(), None);
    }

    #[test]
    fn unrecognized_keys_are_kept_but_ignored() {
        let mut r = TaskRequest::new();
        r.set_value("walltime", "3600").unwrap();
        assert_eq!(r.get_value("walltime"), Some("3600"));
        assert_eq!(r.lprocs(), None);
        assert_eq!(r.memory_kb(), None);
    }

    #[test]
    fn raw_values_are_retained() {
        let r = sample_request();
        assert_eq!(r.get_value(LPROCS), Some("2"));
        assert_eq!(r.get_value(MEMORY), Some("1kb"));
    }

    #[test]
    fn invalid_lprocs_is_rejected() {
        let mut r = TaskRequest::new();
        let err = r.set_value(LPROCS, "two").unwrap_err();
        assert!(matches!(err, RequestError::InvalidCount { .. }));
    }

    #[test]
    fn invalid_memory_is_rejected() {
        let mut r = TaskRequest::new();
        assert!(r.set_value(MEMORY, "1xb").is_err());
    }

    #[test]
    fn memory_units_normalize_to_kb() {
        let mut r = TaskRequest::new();
        r.set_value(MEMORY, "2mb").unwrap();
        assert_eq!(r.memory_kb(), Some(2048));
    }

    #[test]
    fn job_request_builder() {
        let job = JobRequest::new("1.napali")
            .with_group(sample_request(), 4)
            .with_group(TaskRequest::new(), 2);
        assert_eq!(job.job_id, "1.napali");
        assert_eq!(job.groups.len(), 2);
        assert_eq!(job.groups[0].task_count, 4);
    }
}
