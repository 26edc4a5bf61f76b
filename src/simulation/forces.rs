//! Force / acceleration contributors for the hierarchical integrator
//!
//! Every body feels forces relative to the body it orbits. Terms implement
//! [`Acceleration`] and are summed by an [`AccelSet`]; the default set holds
//! only [`ParentGravity`].

use crate::simulation::states::{NVec3, SimBody};

/// What a body sees of its parent during a tick.
///
/// Taken after the parent has been updated, so children follow the parent's
/// position and impulse from the same tick.
#[derive(Debug, Clone, Copy)]
pub struct ParentFrame {
    pub position: NVec3,
    pub velocity: NVec3,
    pub mass: f64,
    pub delta_velocity: NVec3,
}

impl ParentFrame {
    pub fn of(body: &SimBody) -> Self {
        Self {
            position: body.position,
            velocity: body.velocity,
            mass: body.mass,
            delta_velocity: body.delta_velocity,
        }
    }
}

/// Collection of acceleration terms (gravity, drag, etc)
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration vector for the body
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
        }
    }

    /// Parent gravity only, with the given scaled constant
    #[allow(non_snake_case)]
    pub fn gravity(G: f64) -> Self {
        Self::new().with(ParentGravity { G })
    }

    /// Add an acceleration term
    pub fn with(mut self, term: impl Acceleration + Send + Sync + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    /// Total acceleration on `body` from every term
    pub fn accumulate(&self, body: &SimBody, parent: &ParentFrame) -> NVec3 {
        self.terms
            .iter()
            .fold(NVec3::zeros(), |acc, term| acc + term.acceleration(body, parent))
    }
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for acceleration sources acting on a body relative to its parent
pub trait Acceleration {
    fn acceleration(&self, body: &SimBody, parent: &ParentFrame) -> NVec3;
}

/// Two-body Newtonian gravity from the direct parent.
///
/// Siblings and grandparents are ignored: each body's dominant influence is
/// its immediate primary, which keeps a tick O(n) over the tree. This is a
/// modelling limit, so a moon never feels its star directly.
///
/// No softening. A body sitting on its parent yields a non-finite
/// acceleration, which the integrator reports as degenerate.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct ParentGravity {
    pub G: f64, // scaled gravitational constant
}

impl Acceleration for ParentGravity {
    fn acceleration(&self, body: &SimBody, parent: &ParentFrame) -> NVec3 {
        // r points from the parent to the body
        let r = body.position - parent.position;
        let dist = r.norm();

        // a = -dir * G (M + m) / |r|^2
        let magnitude = self.G * (parent.mass + body.mass) / (dist * dist);
        -(r / dist) * magnitude
    }
}

impl ParentGravity {
    /// Specific orbital energy of `body` relative to its parent,
    /// `|v_rel|^2 / 2 - G (M + m) / |r|`. Conserved by the exact two-body
    /// motion, so its drift measures integration error.
    pub fn specific_energy(&self, body: &SimBody, parent: &ParentFrame) -> f64 {
        let r = (body.position - parent.position).norm();
        let v = body.velocity - parent.velocity;
        0.5 * v.norm_squared() - self.G * (parent.mass + body.mass) / r
    }
}
