//! `jobgrid place` — plan a job placement against a topology description.

use std::path::Path;

use anyhow::bail;
use tracing::warn;

use jobgrid_core::{NodeConfig, NodeTopology, PlacementPolicy};
use jobgrid_placement::{Machine, PlacedJob};

use crate::jobfile::JobFile;

pub fn plan(
    topology: &Path,
    job: &Path,
    config: Option<&Path>,
    policy_override: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let desc = NodeTopology::from_file(topology)?;
    let mut config = match config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(name) = policy_override {
        config.placement.policy = parse_policy(name)?;
    }

    let request = JobFile::from_file(job)?.to_request()?;
    let mut machine = Machine::from_topology(&desc, config.placement)?;

    match machine.place_job(&request) {
        Ok(placed) => output(format, &request.job_id, &placed),
        Err(err) => {
            // Partial reservations survive a failed placement; this is a
            // planning tool, so roll them back before reporting.
            machine.free_job_allocation(&request.job_id);
            warn!(job = %request.job_id, "placement failed, partial reservations rolled back");
            Err(err.into())
        }
    }
}

fn parse_policy(name: &str) -> anyhow::Result<PlacementPolicy> {
    match name {
        "threads" => Ok(PlacementPolicy::Threads),
        "cores" => Ok(PlacementPolicy::Cores),
        other => bail!("unknown policy {other:?} (expected threads or cores)"),
    }
}

fn output(format: &str, job_id: &str, placed: &PlacedJob) -> anyhow::Result<()> {
    match format {
        "json" => {
            let out = serde_json::json!({
                "job_id": job_id,
                "cpu_list": placed.cpu_list,
                "mem_list": placed.mem_list,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            println!("job:  {job_id}");
            println!("cpus: {}", placed.cpu_list);
            println!("mems: {}", placed.mem_list);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_parse() {
        assert_eq!(parse_policy("threads").unwrap(), PlacementPolicy::Threads);
        assert_eq!(parse_policy("cores").unwrap(), PlacementPolicy::Cores);
        assert!(parse_policy("sockets").is_err());
    }
}
