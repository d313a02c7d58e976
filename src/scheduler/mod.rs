pub mod aoa;
pub mod codec;
pub mod cost;
pub mod observer;
pub mod population;

pub use aoa::{ExplorationRule, Optimizer, Outcome, TransferFunction};
pub use cost::{estimate_makespan, per_vm_loads, CostModel};
pub use observer::{Fanout, NoopObserver, ProgressEvent, ProgressObserver, RecordingObserver, TracingObserver};
pub use population::{BestSolution, Population};

use crate::config::OptimizerSettings;
use crate::core::{Assignment, Inventory, Task, Vm};
use crate::errors::SchedulerResult;

/// Places `tasks` on `vms` with the canonical AOA settings and an entropy
/// seeded RNG, logging progress through `tracing`.
pub fn optimize(tasks: Vec<Task>, vms: Vec<Vm>, iterations: usize, population_size: usize) -> SchedulerResult<Assignment> {
    let seed = rand::random();
    optimize_with_seed(tasks, vms, iterations, population_size, seed)
}

/// Same as [`optimize`] but reproducible for a given `seed`.
pub fn optimize_with_seed(
    tasks: Vec<Task>,
    vms: Vec<Vm>,
    iterations: usize,
    population_size: usize,
    seed: u64,
) -> SchedulerResult<Assignment> {
    let inventory = Inventory::new(tasks, vms)?;
    let optimizer = Optimizer::new(OptimizerSettings {
        iterations,
        population_size,
        seed: Some(seed),
        ..OptimizerSettings::default()
    })?;

    let outcome = optimizer.run_seeded(&inventory, &mut TracingObserver)?;
    Ok(outcome.assignment)
}
