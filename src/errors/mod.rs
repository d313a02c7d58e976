use thiserror::Error;
use tracing::error;

use crate::core::TaskId;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// Raised by the codec when an assignment skips a task. Inputs are
    /// validated up front, so this only surfaces on an internal bug.
    #[error("Invalid assignment: task {task_id} has no VM")]
    InvalidAssignment {
        task_id: TaskId,
    },

    #[error("Configuration Error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid settings: {message}")]
    InvalidSettings {
        message: String,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("task list is empty")]
    EmptyTasks,

    #[error("VM list is empty")]
    EmptyVms,

    #[error("duplicate task id: {task_id}")]
    DuplicateTaskId {
        task_id: TaskId,
    },

    #[error("duplicate VM name: {name}")]
    DuplicateVmName {
        name: String,
    },

    #[error("task {task_id} references unknown VM: {vm_name}")]
    UnknownVm {
        task_id: TaskId,
        vm_name: String,
    },

    #[error("assignment references unknown task: {task_id}")]
    UnknownTask {
        task_id: TaskId,
    },

    #[error("VM {name} has invalid core count: {value}")]
    InvalidCpuCores {
        name: String,
        value: f64,
    },

    #[error("VM {name} has invalid memory capacity: {value} GB")]
    InvalidRam {
        name: String,
        value: f64,
    },

    #[error("task {task_id} has invalid {resource} demand: {value}")]
    InvalidTaskDemand {
        task_id: TaskId,
        resource: ResourceType,
        value: f64,
    },

    #[error("task {task_id} makes the load of VM '{vm_name}' overflow")]
    UnboundedLoad { task_id: TaskId, vm_name: String },

    #[error("population size must be at least 1")]
    EmptyPopulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Cpu,
    Memory,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Cpu => write!(f, "CPU"),
            ResourceType::Memory => write!(f, "memory"),
        }
    }
}

// Error context for tracking where a failed operation came from
#[derive(Debug)]
pub struct ErrorContext {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source_location: &'static str,
    pub operation: String,
}

impl ErrorContext {
    pub fn log(&self, error: &dyn std::fmt::Display) {
        error!(
            error = error.to_string(),
            context = ?self,
            "Operation failed"
        );
    }
}

// Result type alias for convenience
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Logs the error of `$result` together with an [`ErrorContext`] and hands the
/// result back untouched.
#[macro_export]
macro_rules! with_context {
    ($result:expr, $operation:expr) => {
        $result.map_err(|e| {
            let context = $crate::errors::ErrorContext {
                timestamp: chrono::Utc::now(),
                source_location: std::file!(),
                operation: $operation.to_string(),
            };
            context.log(&e);
            e
        })
    };
}
