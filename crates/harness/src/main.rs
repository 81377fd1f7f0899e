//! Headless scenario runner.
//!
//! Loads a JSON scenario, seeds a particle lattice, steps the solver for the
//! configured number of ticks while watching for divergence, and logs a
//! summary. Exits nonzero if the scenario fails to load or the run blows up.

mod config;
mod scene;

use std::path::Path;
use std::time::Instant;

use solver::{ParticleBuffers, Simulation};

use config::ScenarioConfig;

const DEFAULT_SCENARIO: &str = "crates/harness/scenarios/dam.json";

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SCENARIO.to_string());

    if let Err(e) = run(Path::new(&path)) {
        tracing::error!("Run failed: {e}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), String> {
    let config = ScenarioConfig::load(path)?;
    tracing::info!(
        "Scenario '{}': {} particles, {}x{} grid, dt={}s, {} ticks",
        config.name,
        config.particle_count,
        config.grid_side,
        config.grid_side,
        config.dt,
        config.max_ticks
    );

    let positions = scene::lattice(config.particle_count, config.spacing, config.origin);
    let mut sim = Simulation::new(config.particle_count, config.grid_side, &positions)?;

    let start = Instant::now();
    for tick in 0..config.max_ticks {
        sim.step(config.dt, &config.params)?;

        if diverged(sim.particles()) {
            return Err(format!("simulation diverged at tick {}", tick + 1));
        }
        if (tick + 1) % 100 == 0 {
            let p = sim.particles();
            tracing::info!(
                "tick {}: mean height {:.4} m, max speed {:.3} m/s",
                tick + 1,
                mean_height(p),
                max_speed(p)
            );
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    let mean_density = sim.densities().iter().map(|&d| d as f64).sum::<f64>()
        / sim.particle_count() as f64;
    tracing::info!(
        "Completed {} ticks in {:.2}s ({:.1} ticks/s); mean density {:.1}",
        config.max_ticks,
        elapsed,
        config.max_ticks as f64 / elapsed,
        mean_density
    );
    Ok(())
}

fn diverged(p: &ParticleBuffers) -> bool {
    p.x.iter()
        .chain(&p.y)
        .chain(&p.vx)
        .chain(&p.vy)
        .any(|v| !v.is_finite())
}

fn mean_height(p: &ParticleBuffers) -> f64 {
    p.y.iter().map(|&v| v as f64).sum::<f64>() / p.len() as f64
}

fn max_speed(p: &ParticleBuffers) -> f32 {
    p.vx
        .iter()
        .zip(&p.vy)
        .map(|(vx, vy)| (vx * vx + vy * vy).sqrt())
        .fold(0.0, f32::max)
}
