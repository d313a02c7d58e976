/*
* AOA Scheduler Configuration
* ---------------------------
* @project: aoa-vm-scheduler
*
* Layered configuration, lowest to highest priority:
* 1. Hardcoded defaults (the canonical AOA tuning)
* 2. <CONFIG_PATH>/default.{toml,json,yaml} (optional)
* 3. <CONFIG_PATH>/local.{toml,json,yaml} (optional, for ur machine only)
* 4. Environment variables: APP_OPTIMIZER__ITERATIONS=500 and friends
*
* CONFIG_PATH defaults to ./config. `aoa-scheduler init` writes the defaults
* to config/default.toml so there's something to tweak.
*
* Knobs worth knowing about:
* - iterations / population_size: the search budget
* - exploration_constant (C1), acceleration_constant (C2),
*   transfer_constant (C3), density_constant (C4): the AOA constants
* - cost_model / transfer_function / exploration_rule: pick the simpler
*   variants (cpu_only / exponential / position_difference) if you want the
*   old behaviour back
* - seed: set it and every run gives the same placement
*/

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::{InputError, SchedulerError, SchedulerResult};
use crate::scheduler::{CostModel, ExplorationRule, TransferFunction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub optimizer: OptimizerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub iterations: usize,
    pub population_size: usize,
    /// Seeds [`Optimizer::run_seeded`](crate::scheduler::Optimizer::run_seeded).
    /// `None` draws a fresh seed from entropy on every run.
    #[serde(default)]
    pub seed: Option<u64>,
    pub exploration_constant: f64,
    pub acceleration_constant: f64,
    pub transfer_constant: f64,
    pub density_constant: f64,
    pub exploitation_probability: f64,
    pub cost_model: CostModel,
    pub transfer_function: TransferFunction,
    pub exploration_rule: ExplorationRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            population_size: 30,
            seed: None,
            exploration_constant: 2.0,
            acceleration_constant: 6.0,
            transfer_constant: 2.0,
            density_constant: 0.5,
            exploitation_probability: 0.5,
            cost_model: CostModel::CpuAndMemory,
            transfer_function: TransferFunction::Oscillating,
            exploration_rule: ExplorationRule::Acceleration,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.population_size == 0 {
            return Err(InputError::EmptyPopulation.into());
        }

        let constants = [
            ("exploration_constant", self.exploration_constant),
            ("acceleration_constant", self.acceleration_constant),
            ("transfer_constant", self.transfer_constant),
            ("density_constant", self.density_constant),
        ];
        for (name, value) in constants {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SchedulerError::InvalidSettings {
                    message: format!("{} must be a non-negative number, got {}", name, value),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.exploitation_probability) {
            return Err(SchedulerError::InvalidSettings {
                message: format!(
                    "exploitation_probability must be within [0, 1], got {}",
                    self.exploitation_probability
                ),
            });
        }

        Ok(())
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH")
            .unwrap_or_else(|_| "config".to_string());

        Self::from_dir(&config_path)
    }

    /// Loads `default.*` and `local.*` from `config_path`, both optional.
    pub fn from_dir(config_path: &str) -> Result<Self, ConfigError> {
        info!("Loading configuration from path: {}", config_path);

        let config = with_defaults(Config::builder())?
            .add_source(File::with_name(&format!("{}/default", config_path)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_path)).required(false))
            .add_source(environment())
            .build()?;

        config.try_deserialize()
    }

    /// Loads a single explicit file on top of the defaults.
    pub fn new_from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from file: {}", path.display());

        let config = with_defaults(Config::builder())?
            .add_source(File::from(path))
            .add_source(environment())
            .build()?;

        config.try_deserialize()
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    let defaults = generate_default_config();
    let optimizer = &defaults.optimizer;

    builder
        .set_default("optimizer.iterations", optimizer.iterations as i64)?
        .set_default("optimizer.population_size", optimizer.population_size as i64)?
        .set_default("optimizer.exploration_constant", optimizer.exploration_constant)?
        .set_default("optimizer.acceleration_constant", optimizer.acceleration_constant)?
        .set_default("optimizer.transfer_constant", optimizer.transfer_constant)?
        .set_default("optimizer.density_constant", optimizer.density_constant)?
        .set_default("optimizer.exploitation_probability", optimizer.exploitation_probability)?
        .set_default("optimizer.cost_model", "cpu_and_memory")?
        .set_default("optimizer.transfer_function", "oscillating")?
        .set_default("optimizer.exploration_rule", "acceleration")?
        .set_default("logging.level", defaults.logging.level.as_str())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub fn generate_default_config() -> Settings {
    Settings {
        optimizer: OptimizerSettings::default(),
        logging: LoggingSettings::default(),
    }
}
