//! Physical parameters for the simulation
//!
//! `Parameters` holds the unit conversions baked into the gravity formula:
//! - length scale (km -> internal units),
//! - time compression (simulated motion speed vs wall clock),
//! - an extra scale on the gravitational constant,
//! - the default far-horizon multiplier used for proximity queries
//!
//! `G` is derived from these once, so the builder and the integrator agree.

use crate::configuration::config::SimulationConfig;

/// Gravitational constant in SI units
pub const G_SI: f64 = 6.67384e-11;

#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct Parameters {
    pub length_scale: f64, // internal units per km
    pub time_scale: f64, // time compression factor
    pub gravitational_constant_scale: f64,
    pub far_horizon: f64, // default visibility multiplier on body radius
    pub G: f64, // scaled gravitational constant
}

impl Parameters {
    pub fn new(length_scale: f64, time_scale: f64, gravitational_constant_scale: f64, far_horizon: f64) -> Self {
        // Positions scale linearly with length_scale, so G carries its cube
        // to keep orbit shapes independent of the chosen unit.
        let g = G_SI * gravitational_constant_scale * time_scale * length_scale.powi(3);
        Self {
            length_scale,
            time_scale,
            gravitational_constant_scale,
            far_horizon,
            G: g,
        }
    }

    /// Vis-viva speed of a body at distance `r` on an orbit with semi-major
    /// axis `a` around a primary, both already in internal units
    pub fn vis_viva(&self, parent_mass: f64, mass: f64, r: f64, a: f64) -> f64 {
        (self.G * (parent_mass + mass) * (2.0 / r - 1.0 / a)).sqrt()
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

impl From<&SimulationConfig> for Parameters {
    fn from(cfg: &SimulationConfig) -> Self {
        Self::new(
            cfg.length_scale,
            cfg.time_scale,
            cfg.gravitational_constant_scale,
            cfg.far_horizon,
        )
    }
}
