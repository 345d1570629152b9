//! Five herders drive twenty Brownian targets into a goal at the origin.
//!
//! Run with:
//!
//! ```text
//! cargo run --example shepherding_demo
//! RUST_LOG=herdsim=debug cargo run --example shepherding_demo
//! ```

use herdsim::environment::fraction_in_goal;
use herdsim::{setup_logging, SimulationConfig, Simulator};

const CONFIG: &str = r#"
seed = 2024

[simulator]
T = 60.0

[integrator]
dt = 0.01

[environment]
kind = "shepherding"
goal_radius = 5.0

[[populations]]
name = "herders"
N = 5
state_dim = 2
model = { kind = "simple_integrators", v_max = 20.0 }
initial_conditions = { mode = "circle", min_radius = 45.0, max_radius = 50.0 }

[[populations]]
name = "targets"
N = 20
state_dim = 2
model = { kind = "brownian_motion" }
initial_conditions = { mode = "circle", min_radius = 10.0, max_radius = 40.0 }

[populations.parameters]
mode = "generate"

[populations.parameters.generate]
mu = 0.0
D = { sampler = "uniform", low = 0.5, high = 1.0 }

[[interactions]]
law = "harmonic_repulsion"
target = "targets"
source = "herders"
parameters = { mode = "generate", generate = { strength = 3.0, cutoff = 2.5 } }

[[controllers]]
kind = "shepherding"
population = "herders"
targets = "targets"
dt = 0.05

[logger]
kind = "shepherding"
targets = "targets"
threshold = 0.9
"#;

fn main() {
    setup_logging(Some("info"));

    let config = match SimulationConfig::from_toml_str(CONFIG) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut simulator = match Simulator::from_config(config) {
        Ok(simulator) => simulator,
        Err(e) => {
            eprintln!("failed to build simulator: {}", e);
            std::process::exit(1);
        }
    };

    match simulator.simulate() {
        Ok(outcome) => {
            println!("=== Shepherding demo ===");
            println!(
                "Steps: {} / {} (t = {:.2})",
                outcome.steps, outcome.planned_steps, outcome.final_time
            );
            println!("Stopped early: {}", outcome.early_terminated);
            if let (Ok(targets), Some(goal)) = (
                simulator.population_id("targets"),
                simulator.environment().goal(),
            ) {
                let x = simulator.populations()[targets].state();
                println!(
                    "Targets in goal: {:.0}%",
                    100.0 * fraction_in_goal(x.view(), &goal)
                );
            }
        }
        Err(e) => {
            eprintln!("simulation failed: {}", e);
            std::process::exit(1);
        }
    }
}
