//! Job description files.
//!
//! Bridges the serde-friendly on-disk job format to the placement engine's
//! [`JobRequest`]. The file names resources the way the batch protocol
//! does (`lprocs` count, byte-suffixed `memory`), one `[[groups]]` table
//! per task shape.

use std::path::Path;

use serde::{Deserialize, Serialize};

use jobgrid_core::{JobRequest, TaskRequest, LPROCS, MEMORY};

/// On-disk job description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFile {
    pub job_id: String,
    pub groups: Vec<TaskGroupFile>,
}

/// One task group: how many tasks, and what each one needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroupFile {
    pub tasks: u32,
    /// Logical processors per task; omitted means unconstrained.
    pub lprocs: Option<u64>,
    /// Memory per task with a byte unit suffix (e.g. "512mb"); omitted
    /// means unconstrained.
    pub memory: Option<String>,
}

impl JobFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let job: JobFile = toml::from_str(&content)?;
        Ok(job)
    }

    /// Convert to the engine's request type, validating resource values.
    pub fn to_request(&self) -> anyhow::Result<JobRequest> {
        let mut job = JobRequest::new(self.job_id.clone());
        for group in &self.groups {
            let mut request = TaskRequest::new();
            if let Some(lprocs) = group.lprocs {
                request.set_value(LPROCS, &lprocs.to_string())?;
            }
            if let Some(memory) = &group.memory {
                request.set_value(MEMORY, memory)?;
            }
            job = job.with_group(request, group.tasks);
        }
        Ok(job)
    }
}
