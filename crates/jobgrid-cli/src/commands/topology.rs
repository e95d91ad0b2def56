//! `jobgrid topology` — display the machine built from a description.

use std::path::Path;

use jobgrid_core::{NodeTopology, PlacementConfig};
use jobgrid_placement::Machine;

pub fn show(file: &Path) -> anyhow::Result<()> {
    let desc = NodeTopology::from_file(file)?;
    let machine = Machine::from_topology(&desc, PlacementConfig::default())?;

    print!("{machine}");
    println!();
    println!("sockets: {}", machine.total_sockets());
    println!("chips:   {}", machine.total_chips());
    println!("cores:   {}", machine.total_cores());
    println!("threads: {}", machine.total_threads());
    println!("memory:  {}KB", machine.total_memory_kb());
    Ok(())
}
