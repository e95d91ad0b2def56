//! NUMA chips — the packing and allocation unit.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use jobgrid_core::{ChipTopology, JobId, PlacementPolicy, SocketTopology, TaskRequest};

use crate::allocation::Allocation;
use crate::core::Core;
use crate::error::{PlacementError, PlacementResult};

/// One NUMA node (or, on non-NUMA hardware, a pseudo-chip spanning the
/// whole socket): the unit at which the bin-packing decision and the
/// reservation itself happen.
///
/// Total counts are fixed at initialization from the topology description.
/// `available_memory_kb` and per-core thread ownership move as jobs come
/// and go; one [`Allocation`] per job records exactly what to give back.
#[derive(Debug, Clone)]
pub struct Chip {
    id: u64,
    total_cores: u32,
    total_threads: u32,
    total_memory_kb: u64,
    available_memory_kb: u64,
    /// Offset of this chip's memory blocks in the machine-global memory
    /// index space. Standalone chips use 0.
    mem_base_kb: u64,
    available: bool,
    cores: Vec<Core>,
    allocations: HashMap<JobId, Allocation>,
}

impl Chip {
    /// Build a chip from one NUMA node's description.
    ///
    /// `first_core_id` / `first_thread_id` are the machine-global ids of
    /// this chip's first core and thread; the rest follow in discovery
    /// order. `mem_base_kb` positions this chip's memory in the
    /// machine-global index space.
    pub fn from_numa_node(
        id: u64,
        desc: &ChipTopology,
        first_core_id: u64,
        first_thread_id: u64,
        mem_base_kb: u64,
    ) -> PlacementResult<Chip> {
        Self::build(id, desc.memory_kb, &desc.cores, first_core_id, first_thread_id, mem_base_kb)
    }

    /// Build the pseudo-chip spanning a whole socket on non-NUMA hardware.
    pub fn from_socket(
        id: u64,
        desc: &SocketTopology,
        first_core_id: u64,
        first_thread_id: u64,
        mem_base_kb: u64,
    ) -> PlacementResult<Chip> {
        Self::build(id, desc.memory_kb, &desc.cores, first_core_id, first_thread_id, mem_base_kb)
    }

    fn build(
        id: u64,
        memory_kb: u64,
        core_descs: &[jobgrid_core::CoreTopology],
        first_core_id: u64,
        first_thread_id: u64,
        mem_base_kb: u64,
    ) -> PlacementResult<Chip> {
        if core_descs.is_empty() {
            return Err(PlacementError::Topology(format!(
                "chip {id} reports zero cores"
            )));
        }
        if memory_kb == 0 {
            return Err(PlacementError::Topology(format!(
                "chip {id} reports zero memory"
            )));
        }

        let mut cores = Vec::with_capacity(core_descs.len());
        let mut thread_id = first_thread_id;
        for (i, desc) in core_descs.iter().enumerate() {
            let core = Core::from_topology(first_core_id + i as u64, thread_id, desc)?;
            thread_id += u64::from(core.total_threads());
            cores.push(core);
        }
        let total_threads = cores.iter().map(Core::total_threads).sum();

        Ok(Chip {
            id,
            total_cores: cores.len() as u32,
            total_threads,
            total_memory_kb: memory_kb,
            available_memory_kb: memory_kb,
            mem_base_kb,
            available: true,
            cores,
            allocations: HashMap::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn total_cores(&self) -> u32 {
        self.total_cores
    }

    pub fn total_threads(&self) -> u32 {
        self.total_threads
    }

    pub fn total_memory_kb(&self) -> u64 {
        self.total_memory_kb
    }

    /// Cores with no thread owned.
    pub fn available_cores(&self) -> u32 {
        self.cores.iter().filter(|c| c.is_available()).count() as u32
    }

    pub fn available_threads(&self) -> u32 {
        self.cores.iter().map(Core::available_threads).sum()
    }

    pub fn available_memory_kb(&self) -> u64 {
        self.available_memory_kb
    }

    /// Whether this chip may currently receive new work. Cleared and
    /// restored by maintenance logic outside the placement path.
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    /// Whether this chip holds any reservation for `job_id`.
    pub fn has_job(&self, job_id: &str) -> bool {
        self.allocations.contains_key(job_id)
    }

    /// This chip's reservation record for `job_id`, if any.
    pub fn job_allocation(&self, job_id: &str) -> Option<&Allocation> {
        self.allocations.get(job_id)
    }

    /// How many tasks of this shape fit right now. Pure query.
    ///
    /// Supply is available cores (whole-core packing) or available threads
    /// (thread packing) divided by the per-task processor need; memory
    /// bounds the result when the request names it. An absent dimension is
    /// not limiting, but every task needs at least one processing unit.
    pub fn how_many_tasks_fit(&self, request: &TaskRequest, policy: PlacementPolicy) -> u32 {
        if !self.available {
            return 0;
        }

        let supply = u64::from(match policy {
            PlacementPolicy::Cores => self.available_cores(),
            PlacementPolicy::Threads => self.available_threads(),
        });
        let by_units = supply / units_per_task(request);

        let by_memory = match request.memory_kb() {
            Some(per_task) if per_task > 0 => self.available_memory_kb / per_task,
            _ => u64::MAX,
        };

        by_units.min(by_memory).min(u64::from(u32::MAX)) as u32
    }

    /// Reserve up to `desired` tasks for `job_id`, greedily in core and
    /// thread discovery order.
    ///
    /// Consumed cpu indices are appended, in consumption order, to both
    /// `allocation` (the job-wide accumulator) and this chip's own record
    /// for the job. Memory is deducted as one contiguous block per call,
    /// with the block's starting index recorded. Repeated calls for the
    /// same job accumulate. Returns the number of tasks actually placed,
    /// 0 (with no mutation) when nothing fits.
    pub fn place_task(
        &mut self,
        job_id: &str,
        request: &TaskRequest,
        allocation: &mut Allocation,
        desired: u32,
        policy: PlacementPolicy,
    ) -> PlacementResult<u32> {
        let to_place = desired.min(self.how_many_tasks_fit(request, policy));
        if to_place == 0 {
            return Ok(0);
        }

        let mut reserved = self
            .allocations
            .remove(job_id)
            .unwrap_or_else(|| Allocation::new(job_id));

        let outcome = self.reserve(job_id, request, to_place, policy, allocation, &mut reserved);

        reserved.add_tasks(to_place);
        allocation.add_tasks(to_place);
        self.allocations.insert(job_id.to_string(), reserved);
        outcome?;

        debug!(
            job = job_id,
            chip = self.id,
            placed = to_place,
            available_threads = self.available_threads(),
            available_memory_kb = self.available_memory_kb,
            "reserved tasks"
        );
        Ok(to_place)
    }

    fn reserve(
        &mut self,
        job_id: &str,
        request: &TaskRequest,
        to_place: u32,
        policy: PlacementPolicy,
        allocation: &mut Allocation,
        reserved: &mut Allocation,
    ) -> PlacementResult<()> {
        match policy {
            PlacementPolicy::Cores => {
                // One whole core per task; every thread of it is owned for
                // exact accounting.
                for _ in 0..to_place {
                    let core = self
                        .cores
                        .iter_mut()
                        .find(|c| c.is_available())
                        .ok_or_else(|| PlacementError::OutOfUnits {
                            chip: self.id,
                            job_id: job_id.to_string(),
                        })?;
                    for index in 0..core.total_threads() as usize {
                        core.own_thread(index, job_id)?;
                    }
                    allocation.push_cpu(core.id());
                    reserved.push_cpu(core.id());
                }
            }
            PlacementPolicy::Threads => {
                let mut needed = u64::from(to_place) * units_per_task(request);
                for core in &mut self.cores {
                    while needed > 0 {
                        let Some(index) = core.first_free_thread() else {
                            break;
                        };
                        let thread_id = core.own_thread(index, job_id)?;
                        allocation.push_cpu(thread_id);
                        reserved.push_cpu(thread_id);
                        needed -= 1;
                    }
                    if needed == 0 {
                        break;
                    }
                }
                if needed > 0 {
                    return Err(PlacementError::OutOfUnits {
                        chip: self.id,
                        job_id: job_id.to_string(),
                    });
                }
            }
        }

        if let Some(per_task) = request.memory_kb() {
            if per_task > 0 {
                let block = u64::from(to_place) * per_task;
                let start = self.mem_base_kb + (self.total_memory_kb - self.available_memory_kb);
                self.available_memory_kb -= block;
                allocation.push_mem(start);
                reserved.push_mem(start);
                allocation.add_memory(block);
                reserved.add_memory(block);
            }
        }

        Ok(())
    }

    /// Release everything this chip holds for `job_id`: thread ownership
    /// and memory come back, and the job's record is dropped. Returns true
    /// iff the chip now serves zero jobs. Unknown job ids are a no-op
    /// returning false.
    pub fn free_task(&mut self, job_id: &str) -> bool {
        let Some(reserved) = self.allocations.remove(job_id) else {
            return false;
        };

        let mut released_threads = 0;
        for core in &mut self.cores {
            released_threads += core.release_job(job_id);
        }
        self.available_memory_kb += reserved.memory_kb();

        debug!(
            job = job_id,
            chip = self.id,
            released_threads,
            released_memory_kb = reserved.memory_kb(),
            "released reservation"
        );
        self.allocations.is_empty()
    }
}

/// Logical processors consumed per task. The attribute framework treats an
/// unset count as zero, and a task always occupies at least one unit, so
/// both absent and zero resolve to one.
fn units_per_task(request: &TaskRequest) -> u64 {
    request.lprocs().filter(|&n| n > 0).unwrap_or(1)
}

impl fmt::Display for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Chip {} ({}KB)", self.id, self.total_memory_kb)?;
        for core in &self.cores {
            write!(f, "{core}")?;
        }
        Ok(())
    }
}
