//! Per-step simulation parameters and validation

use serde::{Deserialize, Serialize};

/// Physical parameters consumed by one simulation step.
///
/// Every field has a default matching the reference water scenario, so a
/// partial JSON description deserializes into a runnable parameter set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Rest density of the fluid (kg/m^3)
    #[serde(default = "default_rest_density")]
    pub rest_density: f32,
    /// Pressure stiffness of the linear equation of state
    #[serde(default = "default_pressure_coef")]
    pub pressure_coef: f32,
    /// Mass of a single particle (kg)
    #[serde(default = "default_mass")]
    pub mass: f32,
    /// Interaction radius of the smoothing kernels (m); also the grid cell size
    #[serde(default = "default_effective_radius")]
    pub effective_radius: f32,
    /// Dynamic viscosity coefficient (Pa s)
    #[serde(default = "default_viscosity_coef")]
    pub viscosity_coef: f32,
    /// Spring constant of the boundary penalty force (1/s^2)
    #[serde(default = "default_wall_stiffness")]
    pub wall_stiffness: f32,
    /// Gravitational acceleration (m/s^2)
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 2],
    /// Lower-left corner of the boundary box (m)
    #[serde(default = "default_boundary_min")]
    pub boundary_min: [f32; 2],
    /// Upper-right corner of the boundary box (m)
    #[serde(default = "default_boundary_max")]
    pub boundary_max: [f32; 2],
}

// Default values
fn default_rest_density() -> f32 {
    1000.0
}

fn default_pressure_coef() -> f32 {
    200.0
}

fn default_mass() -> f32 {
    0.0002
}

fn default_effective_radius() -> f32 {
    0.012
}

fn default_viscosity_coef() -> f32 {
    0.1
}

fn default_wall_stiffness() -> f32 {
    10000.0
}

fn default_gravity() -> [f32; 2] {
    [0.0, -9.8]
}

fn default_boundary_min() -> [f32; 2] {
    [0.0, 0.0]
}

fn default_boundary_max() -> [f32; 2] {
    [3.0, 3.0]
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            rest_density: default_rest_density(),
            pressure_coef: default_pressure_coef(),
            mass: default_mass(),
            effective_radius: default_effective_radius(),
            viscosity_coef: default_viscosity_coef(),
            wall_stiffness: default_wall_stiffness(),
            gravity: default_gravity(),
            boundary_min: default_boundary_min(),
            boundary_max: default_boundary_max(),
        }
    }
}

impl SimulationParams {
    /// Validate the parameter set.
    ///
    /// Rejection happens before a tick mutates any state, so a malformed set
    /// of parameters never produces a partially advanced simulation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.rest_density.is_finite() || self.rest_density <= 0.0 {
            return Err(format!(
                "rest_density must be positive and finite, got {}",
                self.rest_density
            ));
        }
        if !self.pressure_coef.is_finite() || self.pressure_coef < 0.0 {
            return Err(format!(
                "pressure_coef must be non-negative and finite, got {}",
                self.pressure_coef
            ));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(format!("mass must be positive and finite, got {}", self.mass));
        }
        if !self.effective_radius.is_finite() || self.effective_radius <= 0.0 {
            return Err(format!(
                "effective_radius must be positive and finite, got {}",
                self.effective_radius
            ));
        }
        if !self.viscosity_coef.is_finite() || self.viscosity_coef < 0.0 {
            return Err(format!(
                "viscosity_coef must be non-negative and finite, got {}",
                self.viscosity_coef
            ));
        }
        if !self.wall_stiffness.is_finite() || self.wall_stiffness < 0.0 {
            return Err(format!(
                "wall_stiffness must be non-negative and finite, got {}",
                self.wall_stiffness
            ));
        }
        if !self.gravity[0].is_finite() || !self.gravity[1].is_finite() {
            return Err("gravity must be finite".to_string());
        }
        if !self.boundary_min.iter().all(|v| v.is_finite())
            || !self.boundary_max.iter().all(|v| v.is_finite())
        {
            return Err("boundary corners must be finite".to_string());
        }
        if self.boundary_min[0] >= self.boundary_max[0] {
            return Err("boundary_min.x must be less than boundary_max.x".to_string());
        }
        if self.boundary_min[1] >= self.boundary_max[1] {
            return Err("boundary_min.y must be less than boundary_max.y".to_string());
        }
        Ok(())
    }
}
