//! Conversion between discrete assignments and the continuous position
//! vectors the search operators perturb.
//!
//! Position `d` of a vector belongs to the d-th task in ascending id order and
//! holds a VM index as a real number. Decoding rounds (ties to even) and wraps
//! with a floor-mod, so any finite value maps to a valid VM.

use crate::core::{Assignment, TaskId};
use crate::errors::{InputError, SchedulerError, SchedulerResult};

/// Position vector for `assignment`. Every id in `task_ids` must be assigned
/// to one of `vm_names`.
pub fn encode(assignment: &Assignment, task_ids: &[TaskId], vm_names: &[String]) -> SchedulerResult<Vec<f64>> {
    task_ids
        .iter()
        .map(|task_id| -> SchedulerResult<f64> {
            let vm_name = assignment
                .get(task_id)
                .ok_or(SchedulerError::InvalidAssignment { task_id: *task_id })?;
            let idx = vm_names
                .iter()
                .position(|name| name == vm_name)
                .ok_or_else(|| InputError::UnknownVm {
                    task_id: *task_id,
                    vm_name: vm_name.clone(),
                })?;
            Ok(idx as f64)
        })
        .collect()
}

/// Assignment encoded by `vector`.
pub fn decode(vector: &[f64], task_ids: &[TaskId], vm_names: &[String]) -> SchedulerResult<Assignment> {
    if vm_names.is_empty() {
        return Err(InputError::EmptyVms.into());
    }
    Ok(task_ids
        .iter()
        .zip(decode_indices(vector, vm_names.len()))
        .map(|(task_id, idx)| (*task_id, vm_names[idx].clone()))
        .collect())
}

/// VM index of every position. `num_vms` must be non-zero.
pub fn decode_indices(vector: &[f64], num_vms: usize) -> Vec<usize> {
    vector.iter().map(|&value| vm_index(value, num_vms)).collect()
}

/// `round(value) mod num_vms`, non-negative for negative inputs.
pub fn vm_index(value: f64, num_vms: usize) -> usize {
    (value.round_ties_even() as i64).rem_euclid(num_vms as i64) as usize
}

/// Bounds a perturbed component to `[0, num_vms - 1]`.
pub fn clamp_position(value: f64, num_vms: usize) -> f64 {
    let upper = num_vms.saturating_sub(1) as f64;
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["vm-a".into(), "vm-b".into(), "vm-c".into()]
    }

    #[test]
    fn decode_inverts_encode() {
        let assignment: Assignment = [(3, "vm-c"), (7, "vm-a"), (11, "vm-b"), (12, "vm-c")]
            .into_iter()
            .map(|(id, vm)| (id, vm.to_string()))
            .collect();
        let ids: Vec<TaskId> = assignment.keys().copied().collect();

        let vector = encode(&assignment, &ids, &names()).unwrap();
        assert_eq!(vector, vec![2.0, 0.0, 1.0, 2.0]);
        assert_eq!(decode(&vector, &ids, &names()).unwrap(), assignment);
    }

    #[test]
    fn encode_requires_every_task() {
        let assignment: Assignment = [(1, "vm-a".to_string())].into_iter().collect();
        let err = encode(&assignment, &[1, 2], &names()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidAssignment { task_id: 2 }));
    }

    #[test]
    fn encode_rejects_foreign_vm() {
        let assignment: Assignment = [(1, "vm-z".to_string())].into_iter().collect();
        assert!(matches!(
            encode(&assignment, &[1], &names()),
            Err(SchedulerError::InvalidInput(InputError::UnknownVm { .. }))
        ));
    }

    #[test]
    fn negative_values_wrap_with_floor_mod() {
        assert_eq!(vm_index(-1.0, 3), 2);
        assert_eq!(vm_index(-4.2, 3), 2);
        assert_eq!(vm_index(5.0, 3), 2);
        assert_eq!(vm_index(1.4, 3), 1);
        assert_eq!(vm_index(2.5, 3), 2);
        assert_eq!(vm_index(0.5, 3), 0);
    }

    #[test]
    fn clamped_out_of_range_values_decode_to_valid_vms() {
        let num_vms = 3;
        for raw in [-3.7, num_vms as f64 + 5.0, f64::NAN] {
            let clamped = clamp_position(raw, num_vms);
            assert!((0.0..=(num_vms - 1) as f64).contains(&clamped));
            assert!(vm_index(clamped, num_vms) < num_vms);
        }
        assert_eq!(vm_index(clamp_position(-3.7, num_vms), num_vms), 0);
        assert_eq!(vm_index(clamp_position(8.0, num_vms), num_vms), 2);
    }

    #[test]
    fn decode_without_vms_fails() {
        assert!(decode(&[0.0], &[1], &[]).is_err());
    }
}
