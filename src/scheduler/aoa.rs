/*
* Archimedes Optimization Algorithm for task placement
* ----------------------------------------------------
* @project: aoa-vm-scheduler
*
* Every candidate is an "object" immersed in a fluid. Its density comes from
* its makespan (cheaper placement = denser object) and its volume from where
* it sits in the VM index space. Objects collide with a random partner and
* rise or sink depending on who is denser during the first half of the run
* (exploration), then get pulled toward the best object found so far during
* the second half (exploitation).
*
* Positions are real-valued and clamped to [0, num_vms - 1] after each move;
* the codec turns them back into VM indices for evaluation. A candidate only
* moves if the new position is strictly cheaper (greedy acceptance), and the
* global best only changes through an accepted move.
*
* Everything runs on one thread with an explicit RNG, so a seeded run is
* fully reproducible.
*/

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

use super::codec;
use super::observer::{ProgressEvent, ProgressObserver};
use super::population::{evaluate, BestSolution, Population};
use crate::config::OptimizerSettings;
use crate::core::{Assignment, Inventory};
use crate::errors::SchedulerResult;

const DENSITY_EPSILON: f64 = 1e-10;

/// Decay of the exploitation pull over the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFunction {
    /// `exp(-t / T)`
    Exponential,
    /// `exp(-t / T) * cos(2π t / T)`
    #[default]
    Oscillating,
}

impl TransferFunction {
    pub fn factor(&self, iteration: usize, iterations: usize) -> f64 {
        if iterations == 0 {
            return 1.0;
        }
        let progress = iteration as f64 / iterations as f64;
        let decay = (-progress).exp();
        match self {
            TransferFunction::Exponential => decay,
            TransferFunction::Oscillating => decay * (2.0 * PI * progress).cos(),
        }
    }
}

/// How a candidate moves relative to its partner during exploration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationRule {
    /// Step from the candidate along the partner direction, sized by the
    /// collision acceleration.
    #[default]
    Acceleration,
    /// Jump to the partner and step along the partner direction, sized by the
    /// raw density difference.
    PositionDifference,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub assignment: Assignment,
    pub makespan: f64,
    pub initial_makespan: f64,
    pub improvements: usize,
}

pub struct Optimizer {
    settings: OptimizerSettings,
}

impl Optimizer {
    pub fn new(settings: OptimizerSettings) -> SchedulerResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    /// Runs the full iteration budget and returns the decoded best placement.
    pub fn run<R, O>(&self, inventory: &Inventory, rng: &mut R, observer: &mut O) -> SchedulerResult<Outcome>
    where
        R: Rng + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        let settings = &self.settings;
        let iterations = settings.iterations;
        let num_vms = inventory.num_vms();
        let cost_model = settings.cost_model;

        info!(
            iterations,
            population = settings.population_size,
            tasks = inventory.num_tasks(),
            vms = num_vms,
            "Starting Archimedes Optimization Algorithm"
        );

        let mut population = Population::initialize(inventory, cost_model, settings.population_size, rng)?;
        let mut best = BestSolution::from_population(&population);
        let initial_makespan = best.fitness();
        observer.on_event(&ProgressEvent::InitialEstimate { value: initial_makespan });

        let mut improvements = 0;
        for t in 0..iterations {
            improvements += self.step(inventory, &mut population, &mut best, t, rng, observer);
            debug!(iteration = t, best = best.fitness(), "Iteration complete");
        }

        let assignment = codec::decode(best.position(), &inventory.task_ids(), &inventory.vm_names())?;
        observer.on_event(&ProgressEvent::Final { value: best.fitness() });

        Ok(Outcome {
            assignment,
            makespan: best.fitness(),
            initial_makespan,
            improvements,
        })
    }

    /// Runs with an RNG seeded from `settings.seed`, or from entropy when no
    /// seed is configured.
    pub fn run_seeded<O>(&self, inventory: &Inventory, observer: &mut O) -> SchedulerResult<Outcome>
    where
        O: ProgressObserver + ?Sized,
    {
        let seed = self.settings.seed.unwrap_or_else(rand::random);
        debug!(seed, "Seeding optimizer");
        self.run(inventory, &mut StdRng::seed_from_u64(seed), observer)
    }

    /// One pass over the population at iteration `t`. Returns how many times
    /// the global best improved.
    fn step<R, O>(
        &self,
        inventory: &Inventory,
        population: &mut Population,
        best: &mut BestSolution,
        t: usize,
        rng: &mut R,
        observer: &mut O,
    ) -> usize
    where
        R: Rng + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        let iterations = self.settings.iterations;
        let num_vms = inventory.num_vms();
        let cost_model = self.settings.cost_model;
        let transfer = self.settings.transfer_function.factor(t, iterations);
        let densities = densities(population.fitness_values());
        let volumes = volumes(population.positions(), num_vms);
        let exploring = (t as f64) < iterations as f64 / 2.0;

        let mut improvements = 0;
        for i in 0..population.len() {
            let j = pick_partner(i, population.len(), rng);
            let density_diff = densities[j] - densities[i];
            let volume_diff = volumes[j] - volumes[i];

            let candidate = if exploring {
                self.explore(
                    population.position(i),
                    population.position(j),
                    density_diff,
                    volume_diff,
                    num_vms,
                    rng,
                )
            } else {
                self.exploit(population.position(i), best.position(), transfer, num_vms, rng)
            };

            let fitness = evaluate(inventory, cost_model, &candidate);
            if fitness < population.fitness(i) {
                if best.offer(&candidate, fitness) {
                    improvements += 1;
                    observer.on_event(&ProgressEvent::Improved { iteration: t, value: fitness });
                }
                population.replace(i, candidate, fitness);
            }
        }
        improvements
    }

    fn explore<R: Rng + ?Sized>(
        &self,
        current: &[f64],
        partner: &[f64],
        density_diff: f64,
        volume_diff: f64,
        num_vms: usize,
        rng: &mut R,
    ) -> Vec<f64> {
        let c1 = self.settings.exploration_constant;
        let rising = density_diff > 0.0;

        match self.settings.exploration_rule {
            ExplorationRule::Acceleration => {
                let acceleration = normalized_acceleration(density_diff, volume_diff, self.settings.density_constant);
                current
                    .iter()
                    .zip(partner)
                    .map(|(&x, &p)| {
                        let step = c1 * rng.gen::<f64>() * acceleration * (p - x);
                        let moved = if rising { x + step } else { x - step };
                        codec::clamp_position(moved, num_vms)
                    })
                    .collect()
            }
            ExplorationRule::PositionDifference => current
                .iter()
                .zip(partner)
                .map(|(&x, &p)| {
                    let step = c1 * rng.gen::<f64>() * density_diff.abs() * (p - x);
                    let moved = if rising { p + step } else { p - step };
                    codec::clamp_position(moved, num_vms)
                })
                .collect(),
        }
    }

    fn exploit<R: Rng + ?Sized>(
        &self,
        current: &[f64],
        best: &[f64],
        transfer: f64,
        num_vms: usize,
        rng: &mut R,
    ) -> Vec<f64> {
        let settings = &self.settings;
        let upper = num_vms.saturating_sub(1) as f64;

        current
            .iter()
            .zip(best)
            .map(|(&x, &b)| {
                let moved = if rng.gen::<f64>() < settings.exploitation_probability {
                    b + settings.acceleration_constant * rng.gen_range(-1.0..=1.0) * transfer * (b - x)
                } else {
                    let target = rng.gen_range(0.0..=upper);
                    b + settings.transfer_constant * rng.gen_range(-1.0..=1.0) * transfer * (target - x)
                };
                codec::clamp_position(moved, num_vms)
            })
            .collect()
    }
}

/// Density of each candidate: the inverse of its makespan normalized by the
/// worst makespan in the population, so the cheapest candidate is densest.
pub fn densities(fitness: &[f64]) -> Vec<f64> {
    let worst = fitness.iter().copied().fold(0.0, f64::max);
    fitness
        .iter()
        .map(|&f| {
            if worst > 0.0 {
                1.0 / (f / worst + DENSITY_EPSILON)
            } else {
                1.0
            }
        })
        .collect()
}

/// Volume of each candidate: the mean of its components over the size of the
/// VM index space.
pub fn volumes(positions: &[Vec<f64>], num_vms: usize) -> Vec<f64> {
    positions
        .iter()
        .map(|position| {
            if position.is_empty() || num_vms == 0 {
                return 0.0;
            }
            position.iter().sum::<f64>() / (position.len() * num_vms) as f64
        })
        .collect()
}

/// Collision acceleration mapped into `[c4, c4 + 1)`.
fn normalized_acceleration(density_diff: f64, volume_diff: f64, c4: f64) -> f64 {
    let raw = (density_diff * volume_diff).abs();
    if raw.is_finite() {
        c4 + raw / (1.0 + raw)
    } else {
        c4 + 1.0
    }
}

/// A uniformly random index other than `i`. A single-object population has no
/// partner, so the object collides with itself.
fn pick_partner<R: Rng + ?Sized>(i: usize, len: usize, rng: &mut R) -> usize {
    if len < 2 {
        return i;
    }
    let j = rng.gen_range(0..len - 1);
    if j >= i {
        j + 1
    } else {
        j
    }
}
