pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod scheduler;

// Re-exports
pub use crate::core::{Assignment, Inventory, Task, TaskId, Vm};
pub use crate::errors::{InputError, SchedulerError, SchedulerResult};
pub use crate::scheduler::{optimize, optimize_with_seed, CostModel, Optimizer, Outcome};
