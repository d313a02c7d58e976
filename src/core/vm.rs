use serde::{Deserialize, Serialize};

/// A virtual machine tasks can be placed on. Never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vm {
    pub name: String,     // unique across the inventory
    pub address: String,  // where the dispatcher finds it, unused by the optimizer
    pub cpu_cores: f64,
    pub ram_gb: f64,
}

impl Vm {
    pub fn new(name: impl Into<String>, address: impl Into<String>, cpu_cores: f64, ram_gb: f64) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            cpu_cores,
            ram_gb,
        }
    }

    /// Memory capacity in MB, the unit tasks express their demand in.
    pub fn ram_mb(&self) -> f64 {
        self.ram_gb * 1024.0
    }
}
