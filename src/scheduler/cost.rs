use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{Assignment, Inventory, Task, TaskId, Vm};
use crate::errors::{InputError, SchedulerResult};

/// How a task's execution time on a VM is estimated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// `cpu_load / cpu_cores`
    CpuOnly,
    /// `cpu_load / cpu_cores + ram_mb / (ram_gb * 1024)`
    #[default]
    CpuAndMemory,
}

impl CostModel {
    /// Estimated time `task` adds to the load of `vm`.
    pub fn task_time(&self, task: &Task, vm: &Vm) -> f64 {
        let cpu = task.cpu_load / vm.cpu_cores;
        match self {
            CostModel::CpuOnly => cpu,
            CostModel::CpuAndMemory => cpu + task.ram_mb / vm.ram_mb(),
        }
    }

    /// Summed load of every VM under `assignment`. VMs without tasks are
    /// present with a load of 0. Accepts any sequence of `(task, vm)` pairs,
    /// so an [`Assignment`] works as well as a plain pair list.
    pub fn vm_loads<'a, I>(
        &self,
        assignment: I,
        tasks: &HashMap<TaskId, Task>,
        vms: &HashMap<String, Vm>,
    ) -> SchedulerResult<HashMap<String, f64>>
    where
        I: IntoIterator<Item = (&'a TaskId, &'a String)>,
    {
        if vms.is_empty() {
            return Err(InputError::EmptyVms.into());
        }

        let mut loads: HashMap<String, f64> = vms.keys().map(|name| (name.clone(), 0.0)).collect();
        for (task_id, vm_name) in assignment {
            let task = tasks
                .get(task_id)
                .ok_or(InputError::UnknownTask { task_id: *task_id })?;
            let vm = vms.get(vm_name).ok_or_else(|| InputError::UnknownVm {
                task_id: *task_id,
                vm_name: vm_name.clone(),
            })?;
            if let Some(load) = loads.get_mut(vm_name) {
                *load += self.task_time(task, vm);
            }
        }
        Ok(loads)
    }

    /// Makespan of `assignment`: the largest per-VM load.
    ///
    /// An empty VM set has no valid assignment and is reported as
    /// [`InputError::EmptyVms`] instead of a makespan of 0.
    pub fn estimate_makespan(
        &self,
        assignment: &Assignment,
        tasks: &HashMap<TaskId, Task>,
        vms: &HashMap<String, Vm>,
    ) -> SchedulerResult<f64> {
        let loads = self.vm_loads(assignment, tasks, vms)?;
        Ok(loads.values().copied().fold(0.0, f64::max))
    }

    /// Per-VM loads in inventory order for a fully decoded candidate, where
    /// `vm_indices[d]` is the VM of the d-th task (ascending id).
    pub fn loads_of_indices(&self, inventory: &Inventory, vm_indices: &[usize]) -> Vec<f64> {
        let vms = inventory.vms();
        let mut loads = vec![0.0; vms.len()];
        for (task, &vm_idx) in inventory.tasks().iter().zip(vm_indices) {
            loads[vm_idx] += self.task_time(task, &vms[vm_idx]);
        }
        loads
    }

    /// Hot-path makespan used by the search loop. Indices must already be in
    /// range; the codec guarantees that.
    pub fn makespan_of_indices(&self, inventory: &Inventory, vm_indices: &[usize]) -> f64 {
        self.loads_of_indices(inventory, vm_indices)
            .into_iter()
            .fold(0.0, f64::max)
    }
}

/// Makespan under the canonical CPU + memory model.
pub fn estimate_makespan(
    assignment: &Assignment,
    tasks: &HashMap<TaskId, Task>,
    vms: &HashMap<String, Vm>,
) -> SchedulerResult<f64> {
    CostModel::default().estimate_makespan(assignment, tasks, vms)
}

/// `(vm name, load)` pairs in inventory order, for reports.
pub fn per_vm_loads(
    cost_model: CostModel,
    inventory: &Inventory,
    assignment: &Assignment,
) -> SchedulerResult<Vec<(String, f64)>> {
    let loads = cost_model.vm_loads(assignment, &inventory.task_map(), &inventory.vm_map())?;
    Ok(inventory
        .vms()
        .iter()
        .map(|vm| (vm.name.clone(), loads.get(&vm.name).copied().unwrap_or(0.0)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SchedulerError;

    fn fixture() -> (HashMap<TaskId, Task>, HashMap<String, Vm>) {
        let tasks = [
            Task::new(1, "encode", 0, 4.0).with_ram_mb(1024.0),
            Task::new(2, "index", 1, 4.0),
            Task::new(3, "thumbs", 2, 2.0),
        ];
        let vms = [
            Vm::new("small", "10.0.0.1", 2.0, 8.0),
            Vm::new("large", "10.0.0.2", 4.0, 16.0),
            Vm::new("idle", "10.0.0.3", 1.0, 1.0),
        ];
        (
            tasks.into_iter().map(|t| (t.id, t)).collect(),
            vms.into_iter().map(|vm| (vm.name.clone(), vm)).collect(),
        )
    }

    fn assignment(pairs: &[(TaskId, &str)]) -> Assignment {
        pairs.iter().map(|(id, vm)| (*id, vm.to_string())).collect()
    }

    #[test]
    fn cpu_and_memory_model_adds_memory_term() {
        let (tasks, vms) = fixture();
        let a = assignment(&[(1, "small"), (2, "large"), (3, "large")]);

        // small: 4/2 + 1024/8192 = 2.125, large: 4/4 + 2/4 = 1.5
        let makespan = CostModel::CpuAndMemory.estimate_makespan(&a, &tasks, &vms).unwrap();
        assert!((makespan - 2.125).abs() < 1e-12);

        let cpu_only = CostModel::CpuOnly.estimate_makespan(&a, &tasks, &vms).unwrap();
        assert!((cpu_only - 2.0).abs() < 1e-12);
    }

    #[test]
    fn idle_vms_report_zero_load() {
        let (tasks, vms) = fixture();
        let a = assignment(&[(1, "small"), (2, "small"), (3, "small")]);
        let loads = CostModel::CpuOnly.vm_loads(&a, &tasks, &vms).unwrap();
        assert_eq!(loads["idle"], 0.0);
        assert_eq!(loads["large"], 0.0);
        assert_eq!(loads["small"], 5.0);
    }

    #[test]
    fn empty_vm_set_is_rejected() {
        let (tasks, _) = fixture();
        let err = CostModel::default()
            .estimate_makespan(&Assignment::new(), &tasks, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(InputError::EmptyVms)));
    }

    #[test]
    fn unknown_references_are_rejected() {
        let (tasks, vms) = fixture();
        let bad_vm = assignment(&[(1, "missing")]);
        assert!(matches!(
            estimate_makespan(&bad_vm, &tasks, &vms),
            Err(SchedulerError::InvalidInput(InputError::UnknownVm { task_id: 1, .. }))
        ));

        let bad_task = assignment(&[(42, "small")]);
        assert!(matches!(
            estimate_makespan(&bad_task, &tasks, &vms),
            Err(SchedulerError::InvalidInput(InputError::UnknownTask { task_id: 42 }))
        ));
    }

    #[test]
    fn result_does_not_depend_on_pair_order() {
        let (tasks, vms) = fixture();
        let small = "small".to_string();
        let large = "large".to_string();
        let forward: Vec<(TaskId, &String)> = vec![(1, &small), (2, &small), (3, &small), (2, &large)];
        let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];

        let expected = CostModel::CpuOnly
            .vm_loads(forward.iter().map(|(id, vm)| (id, *vm)), &tasks, &vms)
            .unwrap();
        assert_eq!(expected["small"], 5.0);
        assert_eq!(expected["large"], 1.0);

        for order in orders {
            let permuted: Vec<(TaskId, &String)> = order.iter().map(|&k| forward[k]).collect();
            let loads = CostModel::CpuOnly
                .vm_loads(permuted.iter().map(|(id, vm)| (id, *vm)), &tasks, &vms)
                .unwrap();
            assert_eq!(loads, expected);
        }
    }

    #[test]
    fn index_path_matches_map_path() {
        let inventory = Inventory::new(
            vec![
                Task::new(1, "encode", 0, 4.0).with_ram_mb(1024.0),
                Task::new(2, "index", 1, 4.0),
            ],
            vec![
                Vm::new("small", "10.0.0.1", 2.0, 8.0),
                Vm::new("large", "10.0.0.2", 4.0, 16.0),
            ],
        )
        .unwrap();
        let a = assignment(&[(1, "large"), (2, "small")]);
        let model = CostModel::CpuAndMemory;

        let by_map = model
            .estimate_makespan(&a, &inventory.task_map(), &inventory.vm_map())
            .unwrap();
        let by_index = model.makespan_of_indices(&inventory, &[1, 0]);
        assert_eq!(by_map, by_index);

        let report = per_vm_loads(model, &inventory, &a).unwrap();
        assert_eq!(report[0], ("small".to_string(), 2.0));
        assert_eq!(report[1].0, "large");
    }
}
