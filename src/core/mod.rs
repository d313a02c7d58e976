pub mod inventory;
pub mod task;
pub mod vm;

// exports for lazy devs like us
pub use inventory::Inventory;
pub use task::{Assignment, Task, TaskId};
pub use vm::Vm;
