//! High-level runtime engine settings
//!
//! Selects tick rate, step mode and capacity used when building and
//! running a simulation

use std::time::Duration;

use crate::configuration::config::{SimulationConfig, StepMode};

#[derive(Debug, Clone)]
pub struct Engine {
    pub hz: f64, // target tick rate
    pub step: StepMode, // measured wall-clock dt or fixed 1/hz
    pub max_dt: Option<f64>, // clamp on a measured step, seconds
    pub max_bodies: usize, // state table capacity
}

impl Engine {
    /// Length of one throttle period
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.hz)
    }

    /// Step handed to the integrator, given the measured time since the
    /// previous tick
    pub fn step_for(&self, measured: f64) -> f64 {
        match self.step {
            StepMode::Fixed => 1.0 / self.hz,
            StepMode::RealTime => match self.max_dt {
                Some(max) => measured.min(max),
                None => measured,
            },
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

impl From<&SimulationConfig> for Engine {
    fn from(cfg: &SimulationConfig) -> Self {
        Self {
            hz: cfg.hz,
            step: cfg.step,
            max_dt: cfg.max_dt,
            max_bodies: cfg.max_bodies,
        }
    }
}
