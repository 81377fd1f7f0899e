//! SPH smoothing kernel functions and the bulk density/force passes.
//!
//! Implements the classic kernel triple from Muller et al. 2003, "Particle-Based
//! Fluid Simulation for Interactive Applications": Poly6 for density summation,
//! the Spiky gradient for pressure forces, and the viscosity Laplacian for
//! momentum diffusion. All kernels share one support radius `h` and vanish at
//! and beyond it, which is what lets the spatial grid use `h` as its cell size.
//!
//! The passes in this module are data-parallel over particles: each particle's
//! output is written by exactly one task, and inputs are the read-only sorted
//! state of the current tick.

use std::f32::consts::PI;

use rayon::prelude::*;

use crate::grid::SpatialGrid;
use crate::params::SimulationParams;
use crate::particle::ParticleBuffers;

/// Densities at or below this are replaced by the rest density when dividing
/// force sums, so a freshly isolated particle never produces inf/NaN motion.
pub const DENSITY_FLOOR: f32 = 1.0e-6;

/// Normalization constants for the kernel triple at a fixed support radius.
///
/// The constants depend only on `h`, so they are computed once per pass
/// instead of per particle pair.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingCoefs {
    /// Support radius h (m)
    pub h: f32,
    /// h^2, the squared-distance cutoff used before any sqrt
    pub h_sq: f32,
    /// Poly6 normalization: 315 / (64 pi h^9)
    pub poly6: f32,
    /// Spiky gradient normalization: -45 / (pi h^6)
    pub spiky_grad: f32,
    /// Viscosity Laplacian normalization: 45 / (pi h^6)
    pub visc_lap: f32,
}

impl SmoothingCoefs {
    /// Precompute the kernel normalizations for support radius `h`.
    pub fn new(h: f32) -> Self {
        Self {
            h,
            h_sq: h * h,
            poly6: 315.0 / (64.0 * PI * h.powi(9)),
            spiky_grad: -45.0 / (PI * h.powi(6)),
            visc_lap: 45.0 / (PI * h.powi(6)),
        }
    }
}

/// Poly6 smoothing kernel, evaluated from the squared distance.
///
/// ```text
/// W(r, h) = (315 / (64 pi h^9)) * (h^2 - r^2)^3   for r < h
/// W(r, h) = 0                                     for r >= h
/// ```
///
/// Taking `r_sq` instead of `r` avoids a square root in the density pass,
/// where this kernel is the only distance-dependent factor.
#[inline]
pub fn poly6_weight(r_sq: f32, coefs: &SmoothingCoefs) -> f32 {
    if r_sq >= coefs.h_sq {
        return 0.0;
    }
    let d = coefs.h_sq - r_sq;
    coefs.poly6 * d * d * d
}

/// Gradient of the Spiky kernel.
///
/// ```text
/// nabla W = (-45 / (pi h^6)) * (h - r)^2 * (r_vec / |r|)   for 0 < r < h
/// ```
///
/// `dx`, `dy` is the displacement from particle j to particle i and `r` its
/// length. The returned vector points from i toward j, so multiplying by a
/// negative pressure factor yields repulsion. Overlapping particles (r near
/// zero) get a zero gradient since the direction is undefined.
#[inline]
pub fn spiky_gradient(dx: f32, dy: f32, r: f32, coefs: &SmoothingCoefs) -> (f32, f32) {
    if r >= coefs.h || r < 1.0e-5 {
        return (0.0, 0.0);
    }
    let d = coefs.h - r;
    let w = coefs.spiky_grad * d * d / r;
    (w * dx, w * dy)
}

/// Laplacian of the viscosity kernel.
///
/// ```text
/// lap W = (45 / (pi h^6)) * (h - r)   for r < h
/// ```
///
/// Positive everywhere inside the support, so viscous exchange always drives
/// neighboring velocities toward each other.
#[inline]
pub fn viscosity_laplacian(r: f32, coefs: &SmoothingCoefs) -> f32 {
    if r >= coefs.h {
        return 0.0;
    }
    coefs.visc_lap * (coefs.h - r)
}

// ---------------------------------------------------------------------------
// Density pass
// ---------------------------------------------------------------------------

/// Compute density for every particle by Poly6 summation over grid neighbors.
///
/// ```text
/// rho_i = sum_j m * W(|r_i - r_j|, h)
/// ```
///
/// The sum runs over the 3x3 block of grid cells around particle i and always
/// includes the self-contribution `m * W(0, h)` exactly once, so an isolated
/// particle still has a positive density.
///
/// `particles` must be the rearranged (grid-sorted) buffer matching `grid`,
/// and `densities` is indexed by the same sorted order.
pub fn compute_densities(
    particles: &ParticleBuffers,
    grid: &SpatialGrid,
    params: &SimulationParams,
    densities: &mut [f32],
) {
    let coefs = SmoothingCoefs::new(params.effective_radius);
    let cell_size = params.effective_radius;
    let mass = params.mass;
    let self_term = mass * poly6_weight(0.0, &coefs);
    let xs = &particles.x;
    let ys = &particles.y;

    densities.par_iter_mut().enumerate().for_each(|(i, rho)| {
        let mut sum = self_term;
        grid.for_each_neighbor(i, xs, ys, cell_size, coefs.h_sq, |_j, _dx, _dy, r_sq| {
            sum += mass * poly6_weight(r_sq, &coefs);
        });
        *rho = sum;
    });
}

// ---------------------------------------------------------------------------
// Force pass
// ---------------------------------------------------------------------------

/// Compute the per-particle acceleration from pressure, viscosity, gravity,
/// and the boundary penalty planes.
///
/// Pressure comes from the linear equation of state
/// `P_i = pressure_coef * (rho_i - rest_density)` and enters through the
/// symmetrized Spiky gradient:
///
/// ```text
/// f_pressure_i = sum_j -m * (P_i + P_j) / (2 rho_j) * nabla W(r_ij, h)
/// f_viscous_i  = sum_j viscosity_coef * m * (v_j - v_i) / rho_j * lap W(r_ij, h)
/// ```
///
/// Both sums are force densities and are divided by the particle's own
/// density (floored per [`DENSITY_FLOOR`]); gravity and the wall springs are
/// accelerations already and are added directly. Each of the four walls
/// pushes back proportionally to penetration depth along its inward normal.
///
/// `particles` and `densities` must share the grid-sorted order; results land
/// in `accel_x`/`accel_y` under the same indexing.
pub fn compute_accelerations(
    particles: &ParticleBuffers,
    densities: &[f32],
    grid: &SpatialGrid,
    params: &SimulationParams,
    accel_x: &mut [f32],
    accel_y: &mut [f32],
) {
    let coefs = SmoothingCoefs::new(params.effective_radius);
    let cell_size = params.effective_radius;
    let mass = params.mass;
    let planes = wall_planes(params.boundary_min, params.boundary_max);
    let xs = &particles.x;
    let ys = &particles.y;
    let vxs = &particles.vx;
    let vys = &particles.vy;

    accel_x
        .par_iter_mut()
        .zip(accel_y.par_iter_mut())
        .enumerate()
        .for_each(|(i, (ax, ay))| {
            let rho_i = densities[i];
            let pressure_i = params.pressure_coef * (rho_i - params.rest_density);
            let vx_i = vxs[i];
            let vy_i = vys[i];

            let mut fx = 0.0f32;
            let mut fy = 0.0f32;
            grid.for_each_neighbor(i, xs, ys, cell_size, coefs.h_sq, |j, dx, dy, r_sq| {
                let r = r_sq.sqrt();
                let rho_j = densities[j];
                let pressure_j = params.pressure_coef * (rho_j - params.rest_density);

                let (gx, gy) = spiky_gradient(dx, dy, r, &coefs);
                let pressure_factor = -mass * (pressure_i + pressure_j) / (2.0 * rho_j);
                fx += pressure_factor * gx;
                fy += pressure_factor * gy;

                let visc_factor =
                    params.viscosity_coef * mass * viscosity_laplacian(r, &coefs) / rho_j;
                fx += visc_factor * (vxs[j] - vx_i);
                fy += visc_factor * (vys[j] - vy_i);
            });

            // Force density to acceleration. A starved density would blow the
            // division up, so it falls back to the rest density.
            let rho_div = if rho_i <= DENSITY_FLOOR {
                params.rest_density
            } else {
                rho_i
            };
            let mut ax_i = fx / rho_div + params.gravity[0];
            let mut ay_i = fy / rho_div + params.gravity[1];

            let px = xs[i];
            let py = ys[i];
            for plane in &planes {
                let dist = plane[0] * px + plane[1] * py + plane[2];
                if dist < 0.0 {
                    ax_i += -dist * params.wall_stiffness * plane[0];
                    ay_i += -dist * params.wall_stiffness * plane[1];
                }
            }

            *ax = ax_i;
            *ay = ay_i;
        });
}

/// The four boundary half-planes as `[nx, ny, offset]` with inward normals.
/// `nx * x + ny * y + offset` is the signed distance, negative outside.
fn wall_planes(min: [f32; 2], max: [f32; 2]) -> [[f32; 3]; 4] {
    [
        [1.0, 0.0, -min[0]],
        [0.0, 1.0, -min[1]],
        [-1.0, 0.0, max[0]],
        [0.0, -1.0, max[1]],
    ]
}
