//! Core state types for the hierarchical simulation.
//!
//! Defines the worker-local body tree and the published per-body record:
//! - `SimBody`   one node of the tree, owning the bodies that orbit it
//! - `BodyState` the kinematics a consumer reads back from the state table
//!
//! Positions and velocities are double precision inside the tree. Bodies sit
//! far from the origin, so single precision would lose the tick-sized motion.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub type NVec3 = Vector3<f64>;

/// What kind of body a recipe node describes
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Star,
    #[default]
    Planet,
    Moon,
    Planetoid,
    Asteroid,
    Comet,
}

#[derive(Debug, Clone)]
pub struct SimBody {
    pub name: String,
    pub kind: BodyKind,
    pub mass: f64,          // kg
    pub radius: f64,        // km
    pub horizon: f64,       // proximity threshold, radius * far_horizon
    pub slot: usize,        // index of this body's record in the state table
    pub position: NVec3,    // scaled km
    pub velocity: NVec3,    // scaled km per second
    pub orientation: NVec3, // heading, pitch, roll (degrees)
    pub spin: NVec3,        // degrees per second
    pub delta_velocity: NVec3, // impulse applied during the current tick
    pub children: Vec<SimBody>,
}

impl SimBody {
    /// Number of bodies in this subtree, self included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SimBody::count).sum::<usize>()
    }

    /// Depth-first search by name
    pub fn find(&self, name: &str) -> Option<&SimBody> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Visit every body depth-first, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SimBody)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Snapshot of the kinematics in the published (mixed precision) layout
    pub fn state(&self) -> BodyState {
        BodyState {
            position: [self.position.x, self.position.y, self.position.z],
            velocity: narrow(&self.velocity),
            orientation: narrow(&self.orientation),
            spin: narrow(&self.spin),
        }
    }
}

fn narrow(v: &NVec3) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

/// One body's published kinematics.
///
/// Position keeps full precision, the rest is single precision.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyState {
    pub position: [f64; 3],
    pub velocity: [f32; 3],
    pub orientation: [f32; 3],
    pub spin: [f32; 3],
}

impl BodyState {
    pub fn position_vec(&self) -> NVec3 {
        NVec3::new(self.position[0], self.position[1], self.position[2])
    }
}

/// Field groups of a record, for selective reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    Position,
    Velocity,
    Orientation,
    Spin,
}

impl StateField {
    pub const ALL: [StateField; 4] = [
        StateField::Position,
        StateField::Velocity,
        StateField::Orientation,
        StateField::Spin,
    ];
}

/// Result of a selective read; unrequested groups stay `None`
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialState {
    pub position: Option<[f64; 3]>,
    pub velocity: Option<[f32; 3]>,
    pub orientation: Option<[f32; 3]>,
    pub spin: Option<[f32; 3]>,
}
