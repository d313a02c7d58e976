use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TaskId = u64;

/// Task id -> VM name. A `BTreeMap` keeps iteration in ascending id order,
/// which is the order the codec lays tasks out in.
pub type Assignment = BTreeMap<TaskId, String>;

/// A unit of work waiting for a VM. Never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub index: i64,
    pub cpu_load: f64,
    #[serde(default)]
    pub ram_mb: f64,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, index: i64, cpu_load: f64) -> Self {
        Self {
            id,
            name: name.into(),
            index,
            cpu_load,
            ram_mb: 0.0,
        }
    }

    pub fn with_ram_mb(mut self, ram_mb: f64) -> Self {
        self.ram_mb = ram_mb;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_memory_demand_defaults_to_zero() {
        let task: Task =
            serde_json::from_str(r#"{"id":3,"name":"render","index":0,"cpu_load":12.5}"#).unwrap();
        assert_eq!(task.ram_mb, 0.0);
        assert_eq!(task, Task::new(3, "render", 0, 12.5));
    }
}
