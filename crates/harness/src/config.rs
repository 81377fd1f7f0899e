//! Scenario configuration loading and validation

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use solver::SimulationParams;

/// A headless run description: what to seed and how long to step it.
///
/// Everything except the name has a default, so a scenario file can be as
/// small as `{"name": "drop"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario name used in logs.
    pub name: String,
    /// Number of particles; must be a power of two.
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    /// Cells per grid axis; must be a power of two.
    #[serde(default = "default_grid_side")]
    pub grid_side: u32,
    /// Lattice spacing of the seeded block (m).
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Lower-left corner of the seeded block (m).
    #[serde(default = "default_origin")]
    pub origin: [f32; 2],
    /// Step size (s).
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Number of steps to run.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Physical parameters passed to every step.
    #[serde(default)]
    pub params: SimulationParams,
}

// Default values
fn default_particle_count() -> usize {
    4096
}

fn default_grid_side() -> u32 {
    256
}

fn default_spacing() -> f32 {
    0.0045
}

fn default_origin() -> [f32; 2] {
    [0.25, 0.25]
}

fn default_dt() -> f32 {
    0.005
}

fn default_max_ticks() -> u64 {
    600
}

impl ScenarioConfig {
    /// Load and validate a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario file {}: {}", path.display(), e))?;
        let config: ScenarioConfig =
            serde_json::from_str(&raw).map_err(|e| format!("Failed to parse scenario JSON: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the scenario, including that the seeded block fits inside
    /// the boundary box.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Scenario name must not be empty".to_string());
        }
        if !self.particle_count.is_power_of_two() {
            return Err(format!(
                "particle_count must be a power of two, got {}",
                self.particle_count
            ));
        }
        if !self.grid_side.is_power_of_two() {
            return Err(format!(
                "grid_side must be a power of two, got {}",
                self.grid_side
            ));
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(format!("spacing must be positive and finite, got {}", self.spacing));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(format!("dt must be positive and finite, got {}", self.dt));
        }
        if self.max_ticks == 0 {
            return Err("max_ticks must be at least 1".to_string());
        }
        if !self.origin[0].is_finite() || !self.origin[1].is_finite() {
            return Err("origin must be finite".to_string());
        }
        self.params.validate()?;

        // The seeded lattice is floor(sqrt(n)) columns wide and spills the
        // remainder into extra rows; the whole block must start and end
        // inside the boundary box.
        let cols = ((self.particle_count as f32).sqrt() as usize).max(1);
        let rows = (self.particle_count + cols - 1) / cols;
        let extent_x = self.spacing * (cols - 1) as f32;
        let extent_y = self.spacing * (rows - 1) as f32;
        let min = self.params.boundary_min;
        let max = self.params.boundary_max;
        if self.origin[0] < min[0] || self.origin[0] + extent_x > max[0] {
            return Err(format!(
                "Seeded block spans x [{}, {}], outside the boundary box",
                self.origin[0],
                self.origin[0] + extent_x
            ));
        }
        if self.origin[1] < min[1] || self.origin[1] + extent_y > max[1] {
            return Err(format!(
                "Seeded block spans y [{}, {}], outside the boundary box",
                self.origin[1],
                self.origin[1] + extent_y
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ScenarioConfig {
        ScenarioConfig {
            name: "test".to_string(),
            particle_count: 4096,
            grid_side: 256,
            spacing: 0.0045,
            origin: [0.25, 0.25],
            dt: 0.005,
            max_ticks: 10,
            params: SimulationParams::default(),
        }
    }

    #[test]
    fn base_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn name_only_json_gets_defaults() {
        let config: ScenarioConfig = serde_json::from_str(r#"{"name": "drop"}"#).unwrap();
        assert_eq!(config.particle_count, 4096);
        assert_eq!(config.grid_side, 256);
        assert_eq!(config.spacing, 0.0045);
        assert_eq!(config.max_ticks, 600);
        assert_eq!(config.params.rest_density, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_params_override_defaults() {
        let config: ScenarioConfig = serde_json::from_str(
            r#"{"name": "drop", "params": {"gravity": [0.0, -5.0]}}"#,
        )
        .unwrap();
        assert_eq!(config.params.gravity, [0.0, -5.0]);
        assert_eq!(config.params.rest_density, 1000.0);
    }

    #[test]
    fn rejects_non_power_of_two_count() {
        let mut config = base_config();
        config.particle_count = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_spacing_and_dt() {
        let mut config = base_config();
        config.spacing = 0.0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.dt = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_block_poking_out_of_the_boundary() {
        let mut config = base_config();
        config.origin = [2.9, 2.9];
        let err = config.validate().unwrap_err();
        assert!(err.contains("outside the boundary box"), "unexpected message: {err}");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ScenarioConfig::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.contains("Failed to read"), "unexpected message: {err}");
    }
}
