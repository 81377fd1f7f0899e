//! 2-D SPH Fluid Solver
//!
//! This crate provides a bulk-synchronous Smoothed Particle Hydrodynamics
//! solver in two dimensions. Every phase of a step is a data-parallel pass
//! over flat arrays separated by a barrier, the layout a GPU compute pipeline
//! would use, executed here on a thread pool.
//!
//! # Modules
//! - [`particle`] -- Struct-of-arrays particle storage.
//! - [`params`] -- Per-step physical parameters and validation.
//! - [`grid`] -- Uniform-grid spatial hash built from sorted packed keys.
//! - [`sort`] -- Parallel bitonic sorting network for the packed keys.
//! - [`sph`] -- Poly6/Spiky/viscosity kernels and the density/force passes.

#![warn(missing_docs)]

pub mod grid;
pub mod params;
pub mod particle;
pub mod sort;
pub mod sph;

pub use grid::SpatialGrid;
pub use params::SimulationParams;
pub use particle::ParticleBuffers;
pub use sph::{
    compute_accelerations, compute_densities, poly6_weight, spiky_gradient,
    viscosity_laplacian, SmoothingCoefs,
};

use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A complete 2-D SPH fluid simulation.
///
/// Each step rebuilds the spatial hash (key packing, bitonic sort, bucket
/// ranges), gathers the current state into the ping-pong buffer in grid
/// order, runs the density and force passes over it, integrates it in place
/// with semi-implicit Euler, and swaps it in as the current state. Exactly
/// two particle buffers exist; a step never copies one into the other
/// element by element.
///
/// Particle order after a step is the grid-sorted order of that step, and
/// [`densities`](Simulation::densities) and
/// [`accelerations`](Simulation::accelerations) share the same indexing as
/// [`particles`](Simulation::particles).
///
/// Dropping the simulation releases every buffer; there is no separate
/// teardown call.
#[derive(Debug)]
pub struct Simulation {
    /// Number of particles, fixed at construction. Always a power of two.
    particle_count: usize,
    /// Spatial hash, rebuilt at the start of every step.
    grid: SpatialGrid,
    /// Particle state the next step reads.
    current: ParticleBuffers,
    /// Ping-pong partner: gather target, integrated in place, then swapped
    /// with `current` at the end of a step.
    next: ParticleBuffers,
    /// Per-particle density from the latest step, in its sorted order.
    density: Vec<f32>,
    /// Per-particle acceleration from the latest step, x component.
    accel_x: Vec<f32>,
    /// Per-particle acceleration from the latest step, y component.
    accel_y: Vec<f32>,
    /// Number of completed steps.
    tick: u64,
}

impl Simulation {
    /// Create a simulation of `particle_count` particles on a
    /// `grid_side x grid_side` cell grid, seeded at `initial_positions` with
    /// zero velocity.
    ///
    /// `particle_count` and `grid_side` must both be powers of two: the
    /// bitonic network requires it for the key array, and power-of-two cell
    /// counts keep the packed key a pair of bit fields. The two fields
    /// together must fit in 32 bits, and `initial_positions` must hold
    /// exactly one position per particle.
    pub fn new(
        particle_count: usize,
        grid_side: u32,
        initial_positions: &[[f32; 2]],
    ) -> Result<Self, String> {
        if !particle_count.is_power_of_two() {
            return Err(format!(
                "particle count must be a power of two, got {particle_count}"
            ));
        }
        if !grid_side.is_power_of_two() {
            return Err(format!("grid side must be a power of two, got {grid_side}"));
        }
        if initial_positions.len() != particle_count {
            return Err(format!(
                "expected {} initial positions, got {}",
                particle_count,
                initial_positions.len()
            ));
        }
        let index_bits = particle_count.trailing_zeros();
        let hash_bits = 2 * grid_side.trailing_zeros();
        if index_bits + hash_bits > 32 {
            return Err(format!(
                "packed keys need {index_bits} index bits and {hash_bits} cell hash bits, \
                 which does not fit in 32"
            ));
        }

        tracing::info!(
            "Initialized SPH state: {} particles, {}x{} grid cells, packed keys use {} + {} bits",
            particle_count,
            grid_side,
            grid_side,
            hash_bits,
            index_bits
        );

        Ok(Self {
            particle_count,
            grid: SpatialGrid::new(grid_side, particle_count),
            current: ParticleBuffers::from_positions(initial_positions),
            next: ParticleBuffers::zeroed(particle_count),
            density: vec![0.0; particle_count],
            accel_x: vec![0.0; particle_count],
            accel_y: vec![0.0; particle_count],
            tick: 0,
        })
    }

    /// Advance the simulation by one step of `dt` seconds.
    ///
    /// Rejects a non-finite or non-positive `dt` and invalid parameters
    /// before touching any state, so a failed call leaves the simulation
    /// exactly as it was.
    pub fn step(&mut self, dt: f32, params: &SimulationParams) -> Result<(), String> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(format!("dt must be positive and finite, got {dt}"));
        }
        params.validate()?;

        let cell_size = params.effective_radius;
        self.grid.build_keys(&self.current.x, &self.current.y, cell_size);
        self.grid.sort_keys();
        self.grid.build_buckets();
        self.grid.gather(&self.current, &mut self.next);

        sph::compute_densities(&self.next, &self.grid, params, &mut self.density);
        sph::compute_accelerations(
            &self.next,
            &self.density,
            &self.grid,
            params,
            &mut self.accel_x,
            &mut self.accel_y,
        );

        self.integrate(dt);
        std::mem::swap(&mut self.current, &mut self.next);
        self.tick += 1;
        Ok(())
    }

    /// Semi-implicit Euler over the gathered buffer, in place: velocity
    /// first, then position from the updated velocity.
    fn integrate(&mut self, dt: f32) {
        let accel_x = &self.accel_x;
        let accel_y = &self.accel_y;
        let ParticleBuffers { x, y, vx, vy } = &mut self.next;

        vx.par_iter_mut()
            .zip(accel_x.par_iter())
            .for_each(|(v, a)| *v += a * dt);
        vy.par_iter_mut()
            .zip(accel_y.par_iter())
            .for_each(|(v, a)| *v += a * dt);

        let vx_new: &[f32] = vx;
        let vy_new: &[f32] = vy;
        x.par_iter_mut()
            .zip(vx_new.par_iter())
            .for_each(|(p, v)| *p += v * dt);
        y.par_iter_mut()
            .zip(vy_new.par_iter())
            .for_each(|(p, v)| *p += v * dt);
    }

    /// Read-only view of the current particle state.
    pub fn particles(&self) -> &ParticleBuffers {
        &self.current
    }

    /// Per-particle densities from the latest step, aligned with
    /// [`particles`](Simulation::particles). All zero before the first step.
    pub fn densities(&self) -> &[f32] {
        &self.density
    }

    /// Per-particle accelerations from the latest step as `(x, y)` slices,
    /// aligned with [`particles`](Simulation::particles).
    pub fn accelerations(&self) -> (&[f32], &[f32]) {
        (&self.accel_x, &self.accel_y)
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Number of completed steps.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
