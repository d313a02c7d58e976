use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{Task, TaskId, Vm};
use crate::errors::{InputError, ResourceType};
use crate::scheduler::CostModel;

#[derive(Debug, Deserialize)]
struct RawInventory {
    vms: Vec<Vm>,
    tasks: Vec<Task>,
}

/// A validated set of tasks and VMs for one optimization run.
///
/// Tasks are kept sorted by id (the codec's vector layout) and VMs keep the
/// order they were supplied in (the codec's VM index space). Construction
/// rejects anything the cost model cannot evaluate, so every later stage can
/// assume a non-empty, well-formed inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawInventory")]
pub struct Inventory {
    vms: Vec<Vm>,
    tasks: Vec<Task>,
    #[serde(skip)]
    task_positions: HashMap<TaskId, usize>,
    #[serde(skip)]
    vm_positions: HashMap<String, usize>,
}

impl Inventory {
    pub fn new(tasks: Vec<Task>, vms: Vec<Vm>) -> Result<Self, InputError> {
        if tasks.is_empty() {
            return Err(InputError::EmptyTasks);
        }
        if vms.is_empty() {
            return Err(InputError::EmptyVms);
        }

        let mut vm_positions = HashMap::with_capacity(vms.len());
        for (idx, vm) in vms.iter().enumerate() {
            if !(vm.cpu_cores.is_finite() && vm.cpu_cores > 0.0) {
                return Err(InputError::InvalidCpuCores {
                    name: vm.name.clone(),
                    value: vm.cpu_cores,
                });
            }
            if !(vm.ram_gb.is_finite() && vm.ram_gb > 0.0) {
                return Err(InputError::InvalidRam {
                    name: vm.name.clone(),
                    value: vm.ram_gb,
                });
            }
            if vm_positions.insert(vm.name.clone(), idx).is_some() {
                return Err(InputError::DuplicateVmName {
                    name: vm.name.clone(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.id) {
                return Err(InputError::DuplicateTaskId { task_id: task.id });
            }
            check_demand(task.id, ResourceType::Cpu, task.cpu_load)?;
            check_demand(task.id, ResourceType::Memory, task.ram_mb)?;
        }
        check_load_bound(&tasks, &vms)?;

        let mut tasks = tasks;
        tasks.sort_by_key(|t| t.id);
        let task_positions = tasks
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.id, idx))
            .collect();

        debug!(tasks = tasks.len(), vms = vms.len(), "Inventory validated");

        Ok(Self {
            vms,
            tasks,
            task_positions,
            vm_positions,
        })
    }

    /// Tasks in ascending id order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// VMs in the order they were supplied.
    pub fn vms(&self) -> &[Vm] {
        &self.vms
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    pub fn vm_names(&self) -> Vec<String> {
        self.vms.iter().map(|vm| vm.name.clone()).collect()
    }

    pub fn num_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn num_vms(&self) -> usize {
        self.vms.len()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.task_positions.get(&id).map(|&idx| &self.tasks[idx])
    }

    pub fn vm(&self, name: &str) -> Option<&Vm> {
        self.vm_index(name).map(|idx| &self.vms[idx])
    }

    pub fn vm_index(&self, name: &str) -> Option<usize> {
        self.vm_positions.get(name).copied()
    }

    /// Lookup tables in the shape the cost model's public entry point takes.
    pub fn task_map(&self) -> HashMap<TaskId, Task> {
        self.tasks.iter().map(|t| (t.id, t.clone())).collect()
    }

    pub fn vm_map(&self) -> HashMap<String, Vm> {
        self.vms.iter().map(|vm| (vm.name.clone(), vm.clone())).collect()
    }
}

impl TryFrom<RawInventory> for Inventory {
    type Error = InputError;

    fn try_from(raw: RawInventory) -> Result<Self, Self::Error> {
        Inventory::new(raw.tasks, raw.vms)
    }
}

fn check_demand(task_id: TaskId, resource: ResourceType, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::InvalidTaskDemand {
            task_id,
            resource,
            value,
        })
    }
}

/// Every load the cost model can produce must stay finite. The memory term is
/// never negative, so `CpuAndMemory` bounds `CpuOnly`, and the sum of each
/// task's worst time bounds the load of any VM.
fn check_load_bound(tasks: &[Task], vms: &[Vm]) -> Result<(), InputError> {
    let mut total = 0.0_f64;
    for task in tasks {
        let mut worst = 0.0_f64;
        let mut worst_vm = &vms[0];
        for vm in vms {
            let time = CostModel::CpuAndMemory.task_time(task, vm);
            if !time.is_finite() {
                return Err(InputError::UnboundedLoad {
                    task_id: task.id,
                    vm_name: vm.name.clone(),
                });
            }
            if time > worst {
                worst = time;
                worst_vm = vm;
            }
        }
        total += worst;
        if !total.is_finite() {
            return Err(InputError::UnboundedLoad {
                task_id: task.id,
                vm_name: worst_vm.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vms() -> Vec<Vm> {
        vec![
            Vm::new("vm-a", "10.0.0.1", 2.0, 8.0),
            Vm::new("vm-b", "10.0.0.2", 4.0, 16.0),
        ]
    }

    #[test]
    fn sorts_tasks_by_id_and_keeps_vm_order() {
        let tasks = vec![Task::new(9, "c", 2, 1.0), Task::new(1, "a", 0, 1.0), Task::new(4, "b", 1, 1.0)];
        let inventory = Inventory::new(tasks, vms()).unwrap();
        assert_eq!(inventory.task_ids(), vec![1, 4, 9]);
        assert_eq!(inventory.vm_names(), vec!["vm-a", "vm-b"]);
        assert_eq!(inventory.vm_index("vm-b"), Some(1));
        assert_eq!(inventory.task(4).map(|t| t.name.as_str()), Some("b"));
    }

    #[test]
    fn rejects_empty_inputs() {
        assert_eq!(Inventory::new(vec![], vms()).unwrap_err(), InputError::EmptyTasks);
        assert_eq!(
            Inventory::new(vec![Task::new(1, "a", 0, 1.0)], vec![]).unwrap_err(),
            InputError::EmptyVms
        );
    }

    #[test]
    fn rejects_duplicates() {
        let tasks = vec![Task::new(1, "a", 0, 1.0), Task::new(1, "b", 1, 1.0)];
        assert_eq!(
            Inventory::new(tasks, vms()).unwrap_err(),
            InputError::DuplicateTaskId { task_id: 1 }
        );

        let mut dup_vms = vms();
        dup_vms.push(Vm::new("vm-a", "10.0.0.3", 1.0, 1.0));
        assert!(matches!(
            Inventory::new(vec![Task::new(1, "a", 0, 1.0)], dup_vms),
            Err(InputError::DuplicateVmName { .. })
        ));
    }

    #[test]
    fn rejects_zero_core_vm() {
        let bad = vec![Vm::new("vm-zero", "10.0.0.9", 0.0, 8.0)];
        assert!(matches!(
            Inventory::new(vec![Task::new(1, "a", 0, 1.0)], bad),
            Err(InputError::InvalidCpuCores { .. })
        ));
    }

    #[test]
    fn rejects_negative_demand() {
        let task = Task::new(1, "a", 0, 1.0).with_ram_mb(-5.0);
        assert_eq!(
            Inventory::new(vec![task], vms()).unwrap_err(),
            InputError::InvalidTaskDemand {
                task_id: 1,
                resource: ResourceType::Memory,
                value: -5.0
            }
        );
    }

    #[test]
    fn deserializing_validates() {
        let json = r#"{"vms": [], "tasks": [{"id": 1, "name": "a", "index": 0, "cpu_load": 1.0}]}"#;
        let err = serde_json::from_str::<Inventory>(json).unwrap_err();
        assert!(err.to_string().contains("VM list is empty"));

        let json = r#"{
            "vms": [{"name": "vm-a", "address": "10.0.0.1", "cpu_cores": 2, "ram_gb": 8}],
            "tasks": [{"id": 2, "name": "b", "index": 1, "cpu_load": 3.0, "ram_mb": 512},
                      {"id": 1, "name": "a", "index": 0, "cpu_load": 1.0}]
        }"#;
        let inventory: Inventory = serde_json::from_str(json).unwrap();
        assert_eq!(inventory.task_ids(), vec![1, 2]);
        assert_eq!(inventory.vm("vm-a").map(|vm| vm.cpu_cores), Some(2.0));
    }

    #[test]
    fn rejects_task_time_that_overflows() {
        let tiny = vec![Vm::new("vm-tiny", "10.0.0.7", 1e-300, 8.0)];
        assert_eq!(
            Inventory::new(vec![Task::new(1, "a", 0, 1e300)], tiny).unwrap_err(),
            InputError::UnboundedLoad {
                task_id: 1,
                vm_name: "vm-tiny".to_string()
            }
        );
    }

    #[test]
    fn rejects_loads_whose_sum_overflows() {
        let one_core = vec![Vm::new("vm-one", "10.0.0.8", 1.0, 8.0)];
        let tasks = vec![Task::new(1, "a", 0, 1e308), Task::new(2, "b", 1, 1e308)];
        assert_eq!(
            Inventory::new(tasks, one_core.clone()).unwrap_err(),
            InputError::UnboundedLoad {
                task_id: 2,
                vm_name: "vm-one".to_string()
            }
        );

        assert!(Inventory::new(vec![Task::new(1, "a", 0, 1e308)], one_core).is_ok());
    }
}
