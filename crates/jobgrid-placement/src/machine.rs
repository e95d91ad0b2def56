//! The whole node — sockets, orchestration, and affinity output.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use jobgrid_core::{JobRequest, NodeTopology, PlacementConfig, PlacementPolicy};

use crate::allocation::Allocation;
use crate::chip::Chip;
use crate::error::{PlacementError, PlacementResult};

/// One socket: an ordered group of chips.
#[derive(Debug, Clone)]
pub struct Socket {
    id: u64,
    chips: Vec<Chip>,
}

impl Socket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn chips(&self) -> &[Chip] {
        &self.chips
    }

    pub fn total_chips(&self) -> u32 {
        self.chips.len() as u32
    }

    pub fn total_cores(&self) -> u32 {
        self.chips.iter().map(Chip::total_cores).sum()
    }

    pub fn total_threads(&self) -> u32 {
        self.chips.iter().map(Chip::total_threads).sum()
    }

    pub fn total_memory_kb(&self) -> u64 {
        self.chips.iter().map(Chip::total_memory_kb).sum()
    }

    /// Chips currently open for new work.
    pub fn available_chips(&self) -> u32 {
        self.chips.iter().filter(|c| c.is_available()).count() as u32
    }

    pub fn available_cores(&self) -> u32 {
        self.chips.iter().map(Chip::available_cores).sum()
    }

    pub fn available_threads(&self) -> u32 {
        self.chips.iter().map(Chip::available_threads).sum()
    }

    pub fn available_memory_kb(&self) -> u64 {
        self.chips.iter().map(Chip::available_memory_kb).sum()
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Socket {}", self.id)?;
        for chip in &self.chips {
            write!(f, "{chip}")?;
        }
        Ok(())
    }
}

/// The affinity mapping produced for a successfully placed job: range
/// strings naming exactly which cpu and memory indices were reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedJob {
    pub cpu_list: String,
    pub mem_list: String,
}

/// The whole node. Owns the socket/chip hierarchy and orchestrates
/// placement of jobs across it.
///
/// Aggregate accessors are pure reductions over the owned chips — nothing
/// is stored twice.
#[derive(Debug, Clone)]
pub struct Machine {
    sockets: Vec<Socket>,
    config: PlacementConfig,
}

impl Machine {
    /// Build the machine from a topology description.
    ///
    /// NUMA styles build one chip per NUMA node; non-NUMA hardware gets one
    /// pseudo-chip spanning each socket. Chip, core, thread, and memory
    /// indices are assigned machine-globally in discovery order.
    pub fn from_topology(desc: &NodeTopology, config: PlacementConfig) -> PlacementResult<Machine> {
        if desc.sockets.is_empty() {
            return Err(PlacementError::Topology(
                "node reports zero sockets".to_string(),
            ));
        }

        let mut sockets = Vec::with_capacity(desc.sockets.len());
        let mut chip_id = 0u64;
        let mut core_id = 0u64;
        let mut thread_id = 0u64;
        let mut mem_base_kb = 0u64;

        for (socket_id, socket_desc) in desc.sockets.iter().enumerate() {
            let mut chips = Vec::new();

            if desc.style.is_numa() {
                if socket_desc.numa_nodes.is_empty() {
                    return Err(PlacementError::Topology(format!(
                        "socket {socket_id} reports zero NUMA nodes on NUMA hardware"
                    )));
                }
                for node in &socket_desc.numa_nodes {
                    let chip = Chip::from_numa_node(chip_id, node, core_id, thread_id, mem_base_kb)?;
                    chip_id += 1;
                    core_id += u64::from(chip.total_cores());
                    thread_id += u64::from(chip.total_threads());
                    mem_base_kb += chip.total_memory_kb();
                    chips.push(chip);
                }
            } else {
                let chip = Chip::from_socket(chip_id, socket_desc, core_id, thread_id, mem_base_kb)?;
                chip_id += 1;
                core_id += u64::from(chip.total_cores());
                thread_id += u64::from(chip.total_threads());
                mem_base_kb += chip.total_memory_kb();
                chips.push(chip);
            }

            sockets.push(Socket {
                id: socket_id as u64,
                chips,
            });
        }

        Ok(Machine { sockets, config })
    }

    /// Build a machine of identical sockets. Convenient for tests and
    /// capacity experiments.
    pub fn with_uniform_sockets(
        sockets: u32,
        chips_per_socket: u32,
        cores_per_chip: u32,
        threads_per_core: u32,
        memory_kb_per_chip: u64,
        config: PlacementConfig,
    ) -> PlacementResult<Machine> {
        use jobgrid_core::{ChipTopology, HardwareStyle, SocketTopology};

        let socket = SocketTopology {
            numa_nodes: vec![
                ChipTopology::uniform(cores_per_chip, threads_per_core, memory_kb_per_chip);
                chips_per_socket as usize
            ],
            memory_kb: 0,
            cores: Vec::new(),
        };
        let desc = NodeTopology {
            style: HardwareStyle::Intel,
            sockets: vec![socket; sockets as usize],
        };
        Self::from_topology(&desc, config)
    }

    pub fn config(&self) -> PlacementConfig {
        self.config
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.config.policy
    }

    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    pub fn total_sockets(&self) -> u32 {
        self.sockets.len() as u32
    }

    pub fn total_chips(&self) -> u32 {
        self.sockets.iter().map(Socket::total_chips).sum()
    }

    pub fn total_cores(&self) -> u32 {
        self.sockets.iter().map(Socket::total_cores).sum()
    }

    pub fn total_threads(&self) -> u32 {
        self.sockets.iter().map(Socket::total_threads).sum()
    }

    pub fn total_memory_kb(&self) -> u64 {
        self.sockets.iter().map(Socket::total_memory_kb).sum()
    }

    /// Sockets with at least one chip open for new work.
    pub fn available_sockets(&self) -> u32 {
        self.sockets
            .iter()
            .filter(|s| s.available_chips() > 0)
            .count() as u32
    }

    pub fn available_chips(&self) -> u32 {
        self.sockets.iter().map(Socket::available_chips).sum()
    }

    pub fn available_cores(&self) -> u32 {
        self.sockets.iter().map(Socket::available_cores).sum()
    }

    pub fn available_threads(&self) -> u32 {
        self.sockets.iter().map(Socket::available_threads).sum()
    }

    pub fn available_memory_kb(&self) -> u64 {
        self.sockets.iter().map(Socket::available_memory_kb).sum()
    }

    /// Reserve resources for every task group of a job and return the
    /// affinity mapping.
    ///
    /// Each group is satisfied on the fewest chips possible: chips are
    /// tried first-fit in discovery order, and a chip that can hold all
    /// remaining tasks takes them all; otherwise it takes what it can and
    /// the remainder spills to the next chip. On
    /// [`PlacementError::InsufficientCapacity`] the reservations made
    /// before the shortfall are NOT rolled back — call
    /// [`free_job_allocation`](Self::free_job_allocation) to release them.
    pub fn place_job(&mut self, job: &JobRequest) -> PlacementResult<PlacedJob> {
        let policy = self.config.policy;
        let mut allocation = Allocation::new(job.job_id.clone());

        for (group, task_group) in job.groups.iter().enumerate() {
            let mut remaining = task_group.task_count;

            'sockets: for socket in &mut self.sockets {
                for chip in &mut socket.chips {
                    if remaining == 0 {
                        break 'sockets;
                    }
                    let placed = chip.place_task(
                        &job.job_id,
                        &task_group.request,
                        &mut allocation,
                        remaining,
                        policy,
                    )?;
                    if placed > 0 {
                        remaining -= placed;
                        debug!(
                            job = %job.job_id,
                            group,
                            chip = chip.id(),
                            placed,
                            remaining,
                            "tasks reserved"
                        );
                    }
                }
            }

            if remaining > 0 {
                warn!(
                    job = %job.job_id,
                    group,
                    unplaced = remaining,
                    "could not place all tasks — insufficient node capacity"
                );
                return Err(PlacementError::InsufficientCapacity {
                    job_id: job.job_id.clone(),
                    group,
                    requested: task_group.task_count,
                    unplaced: remaining,
                });
            }
        }

        let mut cpus = allocation.cpu_indices().to_vec();
        cpus.sort_unstable();
        let mut mems = allocation.mem_indices().to_vec();
        mems.sort_unstable();

        let placed = PlacedJob {
            cpu_list: jobgrid_rangeset::encode(&cpus),
            mem_list: jobgrid_rangeset::encode(&mems),
        };
        info!(
            job = %job.job_id,
            cpus = %placed.cpu_list,
            mems = %placed.mem_list,
            "job placed"
        );
        Ok(placed)
    }

    /// Release everything every chip holds for `job_id`. Chips that become
    /// fully free are re-marked available for new work.
    ///
    /// Safe to call for jobs that were never placed, only partially
    /// placed, or already freed — those cases are a no-op.
    pub fn free_job_allocation(&mut self, job_id: &str) {
        let mut chips_released = 0;
        for socket in &mut self.sockets {
            for chip in &mut socket.chips {
                if chip.has_job(job_id) {
                    chips_released += 1;
                }
                if chip.free_task(job_id) {
                    chip.set_available(true);
                }
            }
        }

        if chips_released == 0 {
            debug!(job = job_id, "nothing to free");
        } else {
            info!(job = job_id, chips = chips_released, "job allocation released");
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Machine ({}KB)", self.total_memory_kb())?;
        for socket in &self.sockets {
            write!(f, "{socket}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobgrid_core::{HardwareStyle, SocketTopology, TaskRequest, LPROCS, MEMORY};

    fn make_request(pairs: &[(&str, &str)]) -> TaskRequest {
        let mut r = TaskRequest::new();
        for (name, value) in pairs {
            r.set_value(name, value).unwrap();
        }
        r
    }

    fn config(policy: PlacementPolicy) -> PlacementConfig {
        PlacementConfig { policy }
    }

    /// Two sockets, one chip each, 2 cores x 2 threads, 40KB per chip:
    /// each chip hosts exactly 4 single-thread tasks.
    fn two_socket_machine(policy: PlacementPolicy) -> Machine {
        Machine::with_uniform_sockets(2, 1, 2, 2, 40, config(policy)).unwrap()
    }

    #[test]
    fn builds_numa_machine_with_global_ids() {
        let machine =
            Machine::with_uniform_sockets(2, 2, 2, 2, 16, config(PlacementPolicy::Threads))
                .unwrap();

        assert_eq!(machine.total_sockets(), 2);
        assert_eq!(machine.total_chips(), 4);
        assert_eq!(machine.total_cores(), 8);
        assert_eq!(machine.total_threads(), 16);
        assert_eq!(machine.total_memory_kb(), 64);
        assert_eq!(machine.available_sockets(), 2);
        assert_eq!(machine.available_chips(), 4);
        assert_eq!(machine.available_cores(), 8);
        assert_eq!(machine.available_threads(), 16);
        assert_eq!(machine.available_memory_kb(), 64);

        // Chip ids run machine-globally in discovery order.
        let chip_ids: Vec<u64> = machine
            .sockets()
            .iter()
            .flat_map(|s| s.chips().iter().map(Chip::id))
            .collect();
        assert_eq!(chip_ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn builds_flat_machine_with_one_pseudo_chip_per_socket() {
        let desc = NodeTopology {
            style: HardwareStyle::NonNuma,
            sockets: vec![
                SocketTopology {
                    numa_nodes: Vec::new(),
                    memory_kb: 8192,
                    cores: vec![jobgrid_core::CoreTopology { threads: 1 }; 4],
                };
                2
            ],
        };
        let machine = Machine::from_topology(&desc, config(PlacementPolicy::Threads)).unwrap();

        assert_eq!(machine.total_sockets(), 2);
        assert_eq!(machine.total_chips(), 2);
        assert_eq!(machine.total_cores(), 8);
        assert_eq!(machine.total_threads(), 8);
        assert_eq!(machine.total_memory_kb(), 16384);
    }

    #[test]
    fn rejects_empty_node() {
        let desc = NodeTopology {
            style: HardwareStyle::Intel,
            sockets: vec![],
        };
        assert!(matches!(
            Machine::from_topology(&desc, PlacementConfig::default()),
            Err(PlacementError::Topology(_))
        ));
    }

    #[test]
    fn rejects_numa_socket_without_nodes() {
        let desc = NodeTopology {
            style: HardwareStyle::Amd,
            sockets: vec![SocketTopology {
                numa_nodes: Vec::new(),
                memory_kb: 4096,
                cores: vec![jobgrid_core::CoreTopology { threads: 2 }],
            }],
        };
        assert!(matches!(
            Machine::from_topology(&desc, PlacementConfig::default()),
            Err(PlacementError::Topology(_))
        ));
    }

    #[test]
    fn places_a_job_and_encodes_the_affinity() {
        let mut machine =
            Machine::with_uniform_sockets(1, 1, 12, 2, 40, config(PlacementPolicy::Threads))
                .unwrap();
        let job = JobRequest::new("1.napali")
            .with_group(make_request(&[(LPROCS, "2"), (MEMORY, "1kb")]), 6);

        let placed = machine.place_job(&job).unwrap();
        assert_eq!(placed.cpu_list, "0-11");
        assert_eq!(placed.mem_list, "0");
        assert_eq!(machine.available_threads(), 12);
        assert_eq!(machine.available_memory_kb(), 34);
    }

    #[test]
    fn consolidates_multiple_groups_onto_one_chip() {
        let mut machine = two_socket_machine(PlacementPolicy::Threads);
        let job = JobRequest::new("1.napali")
            .with_group(make_request(&[(LPROCS, "1")]), 2)
            .with_group(make_request(&[(LPROCS, "1")]), 2);

        machine.place_job(&job).unwrap();

        // Both groups fit the first chip; the second socket is untouched.
        assert_eq!(machine.sockets()[0].available_threads(), 0);
        assert_eq!(machine.sockets()[1].available_threads(), 4);
        let chips_touched = machine
            .sockets()
            .iter()
            .flat_map(Socket::chips)
            .filter(|c| c.has_job("1.napali"))
            .count();
        assert_eq!(chips_touched, 1);
    }

    #[test]
    fn spills_to_the_next_chip_only_when_full() {
        let mut machine = two_socket_machine(PlacementPolicy::Threads);
        let job =
            JobRequest::new("1.napali").with_group(make_request(&[(LPROCS, "1")]), 8);

        let placed = machine.place_job(&job).unwrap();
        assert_eq!(placed.cpu_list, "0-7");

        let chips_touched = machine
            .sockets()
            .iter()
            .flat_map(Socket::chips)
            .filter(|c| c.has_job("1.napali"))
            .count();
        assert_eq!(chips_touched, 2);
        assert_eq!(machine.available_threads(), 0);
    }

    #[test]
    fn mem_list_spans_chips_without_duplicates() {
        let mut machine =
            Machine::with_uniform_sockets(2, 1, 2, 2, 10, config(PlacementPolicy::Threads))
                .unwrap();
        // 8 single-thread tasks at 2KB each: 4 per chip, 8KB per chip.
        let job = JobRequest::new("1.napali")
            .with_group(make_request(&[(LPROCS, "1"), (MEMORY, "2kb")]), 8);

        let placed = machine.place_job(&job).unwrap();
        // One block per chip: chip 0 starts at 0, chip 1 at its base 10.
        assert_eq!(placed.mem_list, "0,10");
        assert_eq!(machine.available_memory_kb(), 4);
    }

    #[test]
    fn placement_failure_reports_the_shortfall() {
        let mut machine = two_socket_machine(PlacementPolicy::Threads);
        let job =
            JobRequest::new("1.napali").with_group(make_request(&[(LPROCS, "1")]), 10);

        let err = machine.place_job(&job).unwrap_err();
        match err {
            PlacementError::InsufficientCapacity {
                job_id,
                requested,
                unplaced,
                ..
            } => {
                assert_eq!(job_id, "1.napali");
                assert_eq!(requested, 10);
                assert_eq!(unplaced, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Partial reservations remain until the caller rolls back.
        assert_eq!(machine.available_threads(), 0);
        machine.free_job_allocation("1.napali");
        assert_eq!(machine.available_threads(), 8);
    }

    #[test]
    fn free_restores_counts_and_is_idempotent() {
        let mut machine = two_socket_machine(PlacementPolicy::Threads);
        let job = JobRequest::new("1.napali")
            .with_group(make_request(&[(LPROCS, "2"), (MEMORY, "5kb")]), 3);

        machine.place_job(&job).unwrap();
        assert_eq!(machine.available_threads(), 2);
        assert_eq!(machine.available_memory_kb(), 65);

        machine.free_job_allocation("1.napali");
        assert_eq!(machine.available_threads(), 8);
        assert_eq!(machine.available_memory_kb(), 80);

        // A repeat free changes nothing.
        machine.free_job_allocation("1.napali");
        assert_eq!(machine.available_threads(), 8);
        assert_eq!(machine.available_memory_kb(), 80);
    }

    #[test]
    fn free_of_unplaced_job_is_safe() {
        let mut machine = two_socket_machine(PlacementPolicy::Threads);
        machine.free_job_allocation("9.napali");
        assert_eq!(machine.available_threads(), 8);
    }

    #[test]
    fn two_jobs_free_independently() {
        let mut machine = two_socket_machine(PlacementPolicy::Threads);
        let job_a =
            JobRequest::new("1.napali").with_group(make_request(&[(LPROCS, "2")]), 2);
        let job_b =
            JobRequest::new("2.napali").with_group(make_request(&[(LPROCS, "2")]), 2);

        machine.place_job(&job_a).unwrap();
        machine.place_job(&job_b).unwrap();
        assert_eq!(machine.available_threads(), 0);

        machine.free_job_allocation("1.napali");
        assert_eq!(machine.available_threads(), 4);
        let placed = machine.place_job(&job_a).unwrap();
        assert_eq!(placed.cpu_list, "0-3");
    }

    #[test]
    fn core_policy_places_whole_cores() {
        let mut machine = two_socket_machine(PlacementPolicy::Cores);
        let job =
            JobRequest::new("1.napali").with_group(make_request(&[(LPROCS, "2")]), 2);

        let placed = machine.place_job(&job).unwrap();
        // Core ids, not thread ids: cores 0 and 1 of the first chip.
        assert_eq!(placed.cpu_list, "0-1");
        assert_eq!(machine.sockets()[0].available_threads(), 0);
    }

    #[test]
    fn display_renders_the_hierarchy() {
        let machine =
            Machine::with_uniform_sockets(1, 1, 1, 2, 2, config(PlacementPolicy::Threads))
                .unwrap();
        let rendered = machine.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Machine (2KB)");
        assert_eq!(lines[1], "  Socket 0");
        assert_eq!(lines[2], "    Chip 0 (2KB)");
        assert_eq!(lines[3], "      Core 0 (2 threads)");
    }
}
