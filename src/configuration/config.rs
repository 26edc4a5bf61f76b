//! Configuration types for loading solar systems from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! system file. A system file consists of:
//!
//! - [`SimulationConfig`] – tick rate, step mode and unit scales
//! - [`OrbitalRecipe`]    – the body tree, each body listing its satellites
//! - [`SystemConfig`]     – top-level wrapper used to load a system from YAML
//!
//! # YAML format
//! A star with one planet and its moon:
//!
//! ```yaml
//! simulation:
//!   hz: 60                  # target tick rate
//!   step: realtime          # or "fixed"
//!   time_scale: 0.06        # 1 hour = 1 minute
//!
//! system:
//!   name: sol
//!   kind: star
//!   mass: 1.9891e30
//!   radius: 696342
//!   sats:
//!     - name: earth
//!       mass: 5.972e24
//!       radius: 6371
//!       aphelion: 152098232
//!       sm_axis: 149598261
//!       rotation: 0.1
//!       sats:
//!         - name: moon
//!           kind: moon
//!           mass: 7.342e22
//!           radius: 1737
//!           aphelion: 405400
//!           sm_axis: 384399
//! ```
//!
//! Every `simulation` key is optional. The recipe is validated when the body
//! tree is built, not here.

use serde::Deserialize;

use crate::simulation::states::BodyKind;

/// How the worker picks the integration step
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    #[default]
    #[serde(rename = "realtime")] // measured wall-clock time since the previous tick
    RealTime,

    #[serde(rename = "fixed")] // 1/hz every tick, reproducible across runs
    Fixed,
}

/// Simulation options. Missing keys take their defaults.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub hz: f64, // target tick rate
    pub step: StepMode, // integration step selection
    pub max_dt: Option<f64>, // clamp on a measured step, seconds
    pub length_scale: f64, // internal units per km
    pub time_scale: f64, // simulated motion speed-up
    pub gravitational_constant_scale: f64, // extra factor on G
    pub far_horizon: f64, // default visibility multiplier on body radius
    pub max_bodies: usize, // state table capacity
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            hz: 60.0,
            step: StepMode::RealTime,
            max_dt: None,
            length_scale: 1.0,
            time_scale: 0.06,
            gravitational_constant_scale: 1.0,
            far_horizon: 1000.0,
            max_bodies: 1000,
        }
    }
}

impl SimulationConfig {
    /// Reject values the integrator cannot run with
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("hz", self.hz),
            ("length_scale", self.length_scale),
            ("time_scale", self.time_scale),
            ("gravitational_constant_scale", self.gravitational_constant_scale),
            ("far_horizon", self.far_horizon),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("`{key}` must be positive and finite, got {value}"));
            }
        }
        if let Some(max_dt) = self.max_dt {
            if !(max_dt.is_finite() && max_dt > 0.0) {
                return Err(format!("`max_dt` must be positive and finite, got {max_dt}"));
            }
        }
        if self.max_bodies == 0 {
            return Err("`max_bodies` must be at least 1".to_string());
        }
        Ok(())
    }
}

/// One body of the system and, recursively, everything orbiting it
#[derive(Deserialize, Debug, Clone)]
pub struct OrbitalRecipe {
    pub name: String, // unique key
    #[serde(default)]
    pub kind: BodyKind,
    pub mass: f64, // kg
    pub radius: f64, // km
    #[serde(default)]
    pub aphelion: Option<f64>, // initial distance from the parent, km
    #[serde(default)]
    pub sm_axis: Option<f64>, // semi-major axis, km
    #[serde(default)]
    pub rotation: f64, // spin about the heading axis, degrees per simulated second
    #[serde(default)]
    pub far_horizon: Option<f64>, // overrides the configured multiplier
    #[serde(default)]
    pub sats: Vec<OrbitalRecipe>, // satellites, in order
}

/// Body totals by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Census {
    pub stars: usize,
    pub planets: usize,
    pub moons: usize,
    pub other: usize,
    pub total: usize,
}

impl OrbitalRecipe {
    pub fn node_count(&self) -> usize {
        1 + self.sats.iter().map(OrbitalRecipe::node_count).sum::<usize>()
    }

    pub fn census(&self) -> Census {
        let mut census = Census::default();
        self.tally(&mut census);
        census
    }

    fn tally(&self, census: &mut Census) {
        match self.kind {
            BodyKind::Star => census.stars += 1,
            BodyKind::Planet => census.planets += 1,
            BodyKind::Moon => census.moons += 1,
            _ => census.other += 1,
        }
        census.total += 1;
        for sat in &self.sats {
            sat.tally(census);
        }
    }
}

/// Top-level system file loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct SystemConfig {
    #[serde(default)]
    pub simulation: SimulationConfig, // tick rate, scales, capacity
    pub system: OrbitalRecipe, // root of the body tree (the primary star)
}

impl SystemConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}
