//! Error types for recipe building, queries and the integrator worker

use thiserror::Error;

/// Malformed or physically invalid orbital recipe.
/// Raised while building the body tree, before any state table exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecipeError {
    #[error("body `{body}` has non-positive mass {mass}")]
    NonPositiveMass { body: String, mass: f64 },

    #[error("body `{body}` has invalid radius {radius}")]
    InvalidRadius { body: String, radius: f64 },

    #[error("body `{body}` is missing required orbital element `{element}`")]
    MissingElement { body: String, element: &'static str },

    #[error("body `{body}` has non-positive orbital element `{element}` = {value}")]
    NonPositiveElement { body: String, element: &'static str, value: f64 },

    #[error("body `{body}` is not bound to its parent (aphelion {aphelion}, semi-major axis {sm_axis})")]
    UnboundOrbit { body: String, aphelion: f64, sm_axis: f64 },

    #[error("body name `{0}` appears more than once")]
    DuplicateName(String),

    #[error("recipe holds {count} bodies, capacity is {max}")]
    TooManyBodies { count: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error("unknown body `{0}`")]
    UnknownBody(String),

    #[error("integrator worker failed: {0}")]
    WorkerFailure(String),

    #[error("body `{body}` became degenerate: {reason}")]
    Degenerate { body: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no system has been initialised")]
    NotInitialized,

    #[error("simulation is already running")]
    AlreadyRunning,

    #[error("state table already has a writer")]
    WriterClaimed,
}
