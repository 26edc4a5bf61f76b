pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use simulation::states::{BodyKind, BodyState, NVec3, PartialState, SimBody, StateField};
pub use simulation::error::{RecipeError, SimError};
pub use simulation::forces::{AccelSet, Acceleration, ParentFrame, ParentGravity};
pub use simulation::integrator::tick;
pub use simulation::scenario::{build_tree, Scenario};
pub use simulation::table::{StateTable, TableWriter};
pub use simulation::throttle::Throttle;
pub use simulation::controller::{Simulator, WorkerStatus};
pub use simulation::params::Parameters;
pub use simulation::engine::Engine;

pub use configuration::config::{Census, OrbitalRecipe, SimulationConfig, StepMode, SystemConfig};

pub use benchmark::benchmark::{bench_rate, bench_tick, time_ticks};
