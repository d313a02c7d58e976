use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::codec;
use super::cost::CostModel;
use crate::core::{Assignment, Inventory};
use crate::errors::{InputError, SchedulerResult};

/// Candidate position vectors paired index-for-index with their makespans.
#[derive(Debug, Clone)]
pub struct Population {
    positions: Vec<Vec<f64>>,
    fitness: Vec<f64>,
}

impl Population {
    /// Draws `size` random assignments (a uniformly random VM per task) and
    /// evaluates each one.
    pub fn initialize<R: Rng + ?Sized>(
        inventory: &Inventory,
        cost_model: CostModel,
        size: usize,
        rng: &mut R,
    ) -> SchedulerResult<Self> {
        if size == 0 {
            return Err(InputError::EmptyPopulation.into());
        }

        let task_ids = inventory.task_ids();
        let vm_names = inventory.vm_names();
        let mut positions = Vec::with_capacity(size);
        let mut fitness = Vec::with_capacity(size);

        for _ in 0..size {
            let mut assignment = Assignment::new();
            for task_id in &task_ids {
                let vm_name = vm_names.choose(rng).ok_or(InputError::EmptyVms)?;
                assignment.insert(*task_id, vm_name.clone());
            }
            let position = codec::encode(&assignment, &task_ids, &vm_names)?;
            fitness.push(evaluate(inventory, cost_model, &position));
            positions.push(position);
        }

        debug!(size, "Population initialized");
        Ok(Self { positions, fitness })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, idx: usize) -> &[f64] {
        &self.positions[idx]
    }

    pub fn positions(&self) -> &[Vec<f64>] {
        &self.positions
    }

    pub fn fitness(&self, idx: usize) -> f64 {
        self.fitness[idx]
    }

    pub fn fitness_values(&self) -> &[f64] {
        &self.fitness
    }

    /// Index of the lowest makespan, first occurrence on ties.
    pub fn best_index(&self) -> usize {
        let mut best = 0;
        for (idx, &value) in self.fitness.iter().enumerate().skip(1) {
            if value < self.fitness[best] {
                best = idx;
            }
        }
        best
    }

    pub fn replace(&mut self, idx: usize, position: Vec<f64>, fitness: f64) {
        self.positions[idx] = position;
        self.fitness[idx] = fitness;
    }
}

/// The best position ever observed during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSolution {
    position: Vec<f64>,
    fitness: f64,
}

impl BestSolution {
    pub fn from_population(population: &Population) -> Self {
        let idx = population.best_index();
        Self {
            position: population.position(idx).to_vec(),
            fitness: population.fitness(idx),
        }
    }

    /// Takes a copy of `position` if `fitness` strictly improves on the
    /// current best. Returns whether it did.
    pub fn offer(&mut self, position: &[f64], fitness: f64) -> bool {
        if fitness < self.fitness {
            self.position.clear();
            self.position.extend_from_slice(position);
            self.fitness = fitness;
            true
        } else {
            false
        }
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }
}

/// Decodes `position` and returns its makespan.
pub fn evaluate(inventory: &Inventory, cost_model: CostModel, position: &[f64]) -> f64 {
    let indices = codec::decode_indices(position, inventory.num_vms());
    cost_model.makespan_of_indices(inventory, &indices)
}
