/*
* AOA Scheduler Command Line Interface
* ------------------------------------
* @project: aoa-vm-scheduler
*
* Command Structure:
* ---------------
* aoa-scheduler
* ├── optimize --inventory FILE   // find a placement (the whole point of this crate)
* ├── evaluate --inventory FILE   // score a placement you already have
* │            --assignment FILE
* └── init                        // write config/default.toml
*
* The inventory is a JSON document:
*   { "vms":   [{ "name": "vm-a", "address": "10.0.0.1", "cpu_cores": 4, "ram_gb": 16 }],
*     "tasks": [{ "id": 1, "name": "encode", "index": 0, "cpu_load": 12.5, "ram_mb": 512 }] }
* and an assignment is a JSON object of task id -> VM name.
*
* Logs go to stderr, results to stdout, so `--json | jq` just works.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

use crate::config::{OptimizerSettings, Settings};
use crate::core::{Assignment, Inventory};
use crate::scheduler::{per_vm_loads, Fanout, Optimizer, ProgressEvent, ProgressObserver, RecordingObserver, TracingObserver};
use crate::with_context;

#[derive(Parser)]
#[command(name = "aoa-scheduler")]
#[command(about = "Task-to-VM placement with the Archimedes Optimization Algorithm", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for a low-makespan placement
    Optimize {
        #[arg(short, long)]
        inventory: PathBuf,
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        #[arg(short, long)]
        population: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
        /// Print a machine-readable report instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Compute the makespan of an existing placement
    Evaluate {
        #[arg(short, long)]
        inventory: PathBuf,
        #[arg(short, long)]
        assignment: PathBuf,
    },
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct VmLoad {
    pub vm: String,
    pub load: f64,
    pub tasks: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub seed: u64,
    pub iterations: usize,
    pub population_size: usize,
    pub initial_makespan: f64,
    pub makespan: f64,
    pub improvements: usize,
    pub assignment: Assignment,
    pub loads: Vec<VmLoad>,
    pub progress: Vec<ProgressEvent>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::new_from_file(path)?,
        None => Settings::new()?,
    };
    init_logging(&settings, cli.verbose);

    match cli.command {
        Commands::Optimize {
            inventory,
            iterations,
            population,
            seed,
            json,
        } => {
            let mut optimizer_settings = settings.optimizer.clone();
            if let Some(iterations) = iterations {
                optimizer_settings.iterations = iterations;
            }
            if let Some(population) = population {
                optimizer_settings.population_size = population;
            }
            if seed.is_some() {
                optimizer_settings.seed = seed;
            }
            handle_optimize(&inventory, optimizer_settings, json)?;
        }
        Commands::Evaluate { inventory, assignment } => {
            handle_evaluate(&inventory, &assignment, &settings.optimizer)?;
        }
        Commands::Init { force } => {
            handle_init_command(force)?;
        }
    }

    Ok(())
}

fn init_logging(settings: &Settings, verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        settings.logging.level.parse().unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_inventory(path: &Path) -> Result<Inventory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading inventory {}", path.display()))?;
    let inventory = serde_json::from_str(&raw)
        .with_context(|| format!("parsing inventory {}", path.display()))?;
    Ok(inventory)
}

pub fn load_assignment(path: &Path) -> Result<Assignment> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading assignment {}", path.display()))?;
    let assignment = serde_json::from_str(&raw)
        .with_context(|| format!("parsing assignment {}", path.display()))?;
    Ok(assignment)
}

fn handle_optimize(inventory_path: &Path, mut settings: OptimizerSettings, json: bool) -> Result<()> {
    let inventory = with_context!(load_inventory(inventory_path), "load inventory")?;

    let seed = *settings.seed.get_or_insert_with(rand::random);
    info!(seed, "Seeding optimizer");
    let started_at = chrono::Utc::now();

    let optimizer = Optimizer::new(settings)?;
    let mut tracer = TracingObserver;
    let mut recorder = RecordingObserver::new();
    let outcome = {
        let mut observer = Fanout::new(vec![
            &mut tracer as &mut dyn ProgressObserver,
            &mut recorder as &mut dyn ProgressObserver,
        ]);
        with_context!(
            optimizer.run_seeded(&inventory, &mut observer),
            "optimize placement"
        )?
    };

    let loads = vm_loads(&inventory, &outcome.assignment, optimizer.settings())?;

    if json {
        let report = RunReport {
            run_id: uuid::Uuid::new_v4(),
            started_at,
            seed,
            iterations: optimizer.settings().iterations,
            population_size: optimizer.settings().population_size,
            initial_makespan: outcome.initial_makespan,
            makespan: outcome.makespan,
            improvements: outcome.improvements,
            assignment: outcome.assignment,
            loads,
            progress: recorder.events,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Placement:".bold());
    print_loads(&loads, &inventory);
    println!(
        "{} makespan {:.2} (initial {:.2}, {} improvements, seed {})",
        "✓".green(),
        outcome.makespan,
        outcome.initial_makespan,
        outcome.improvements,
        seed
    );
    Ok(())
}

fn handle_evaluate(inventory_path: &Path, assignment_path: &Path, settings: &OptimizerSettings) -> Result<()> {
    let inventory = with_context!(load_inventory(inventory_path), "load inventory")?;
    let assignment = with_context!(load_assignment(assignment_path), "load assignment")?;

    let loads = vm_loads(&inventory, &assignment, settings)?;
    let makespan = loads.iter().map(|l| l.load).fold(0.0, f64::max);
    let unassigned = inventory
        .task_ids()
        .into_iter()
        .filter(|id| !assignment.contains_key(id))
        .count();

    println!("{}", "Placement:".bold());
    print_loads(&loads, &inventory);
    if unassigned > 0 {
        println!("{} {} task(s) have no VM", "!".yellow(), unassigned);
    }
    println!("Estimated makespan: {:.2}", makespan);
    Ok(())
}

fn vm_loads(inventory: &Inventory, assignment: &Assignment, settings: &OptimizerSettings) -> Result<Vec<VmLoad>> {
    let loads = per_vm_loads(settings.cost_model, inventory, assignment)?;
    Ok(loads
        .into_iter()
        .map(|(vm, load)| {
            let tasks = assignment
                .iter()
                .filter(|(_, name)| **name == vm)
                .map(|(id, _)| *id)
                .collect();
            VmLoad { vm, load, tasks }
        })
        .collect())
}

fn print_loads(loads: &[VmLoad], inventory: &Inventory) {
    let makespan = loads.iter().map(|l| l.load).fold(0.0, f64::max);
    for entry in loads {
        let load = format!("{:.2}", entry.load);
        let load = if entry.load == makespan { load.red() } else { load.green() };
        let names: Vec<String> = entry
            .tasks
            .iter()
            .map(|id| match inventory.task(*id) {
                Some(task) => format!("{}#{}", task.name, id),
                None => id.to_string(),
            })
            .collect();
        println!("- {} [{}] {}", entry.vm.bold(), load, names.join(", "));
    }
}

fn handle_init_command(force: bool) -> Result<()> {
    let config_dir = PathBuf::from("config");
    let target = config_dir.join("default.toml");
    if target.exists() && !force {
        error!("Configuration file already exists. Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let default_config = crate::config::generate_default_config();
    let config_str = toml::to_string_pretty(&default_config)?;
    std::fs::write(&target, config_str)?;

    println!("{} Default configuration generated", "✓".green());
    Ok(())
}
