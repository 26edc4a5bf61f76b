//! Build fully-initialized simulation trees from recipes
//!
//! Takes an [`OrbitalRecipe`] (YAML-facing) and produces the runtime bundle
//! (`Scenario`) containing:
//! - the body tree (`SimBody`), each body parented to the body it orbits
//! - the shared state table, seeded with every body's initial record
//!
//! Initial conditions model coplanar orbits started at aphelion: every body
//! sits on +x at its parent's position plus its own aphelion, moving along +y
//! with its parent's velocity plus its vis-viva speed.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::configuration::config::{OrbitalRecipe, SystemConfig};
use crate::simulation::engine::Engine;
use crate::simulation::error::{RecipeError, SimError};
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, SimBody};
use crate::simulation::table::StateTable;

/// A built system ready to be handed to the integrator worker
#[derive(Debug)]
pub struct Scenario {
    pub root: SimBody,
    pub table: Arc<StateTable>,
}

impl Scenario {
    /// Validate `recipe`, build the tree, then allocate and seed the table.
    /// Nothing is allocated when the recipe is rejected.
    pub fn from_recipe(recipe: &OrbitalRecipe, parameters: &Parameters, max_bodies: usize) -> Result<Self, SimError> {
        let count = recipe.node_count();
        if count > max_bodies {
            return Err(RecipeError::TooManyBodies { count, max: max_bodies }.into());
        }
        let root = build_tree(recipe, parameters)?;
        let table = Arc::new(StateTable::from_tree(&root)?);
        debug!("built system `{}`: {} bodies", root.name, table.len());
        Ok(Self { root, table })
    }

    /// Build from a loaded system file with its own simulation settings
    pub fn build(cfg: &SystemConfig) -> Result<Self, SimError> {
        let parameters = Parameters::from(&cfg.simulation);
        let engine = Engine::from(&cfg.simulation);
        Self::from_recipe(&cfg.system, &parameters, engine.max_bodies)
    }
}

/// Convert a recipe into the body tree, validating every node
pub fn build_tree(recipe: &OrbitalRecipe, parameters: &Parameters) -> Result<SimBody, RecipeError> {
    let mut builder = TreeBuilder {
        parameters,
        names: HashSet::new(),
        next_slot: 0,
    };
    builder.add_body(recipe, None)
}

struct TreeBuilder<'a> {
    parameters: &'a Parameters,
    names: HashSet<String>,
    next_slot: usize,
}

impl TreeBuilder<'_> {
    fn add_body(&mut self, recipe: &OrbitalRecipe, parent: Option<&SimBody>) -> Result<SimBody, RecipeError> {
        check_body(recipe)?;
        if !self.names.insert(recipe.name.clone()) {
            return Err(RecipeError::DuplicateName(recipe.name.clone()));
        }

        let (position, velocity) = match parent {
            // Root: the fixed frame, at rest
            None => {
                let x = recipe.aphelion.unwrap_or(0.0) * self.parameters.length_scale;
                (NVec3::new(x, 0.0, 0.0), NVec3::zeros())
            }
            Some(parent) => {
                let (r, a) = orbital_elements(recipe)?;
                let r = r * self.parameters.length_scale;
                let a = a * self.parameters.length_scale;
                let v = self.parameters.vis_viva(parent.mass, recipe.mass, r, a);
                (
                    parent.position + NVec3::new(r, 0.0, 0.0),
                    parent.velocity + NVec3::new(0.0, v, 0.0),
                )
            }
        };

        let far_horizon = recipe.far_horizon.unwrap_or(self.parameters.far_horizon);
        let slot = self.next_slot;
        self.next_slot += 1;

        let mut body = SimBody {
            name: recipe.name.clone(),
            kind: recipe.kind,
            mass: recipe.mass,
            radius: recipe.radius,
            horizon: recipe.radius * far_horizon,
            slot,
            position,
            velocity,
            orientation: NVec3::zeros(),
            spin: NVec3::new(recipe.rotation, 0.0, 0.0),
            delta_velocity: NVec3::zeros(),
            children: Vec::new(),
        };

        let mut children = Vec::with_capacity(recipe.sats.len());
        for sat in &recipe.sats {
            children.push(self.add_body(sat, Some(&body))?);
        }
        body.children = children;
        Ok(body)
    }
}

fn check_body(recipe: &OrbitalRecipe) -> Result<(), RecipeError> {
    if !(recipe.mass.is_finite() && recipe.mass > 0.0) {
        return Err(RecipeError::NonPositiveMass {
            body: recipe.name.clone(),
            mass: recipe.mass,
        });
    }
    if !(recipe.radius.is_finite() && recipe.radius >= 0.0) {
        return Err(RecipeError::InvalidRadius {
            body: recipe.name.clone(),
            radius: recipe.radius,
        });
    }
    Ok(())
}

/// Aphelion and semi-major axis of a non-root body, checked for a bound orbit
fn orbital_elements(recipe: &OrbitalRecipe) -> Result<(f64, f64), RecipeError> {
    let r = required(recipe, "aphelion", recipe.aphelion)?;
    let a = required(recipe, "sm_axis", recipe.sm_axis)?;
    // vis-viva needs 2/r - 1/a > 0, i.e. r < 2a
    if 2.0 / r - 1.0 / a <= 0.0 {
        return Err(RecipeError::UnboundOrbit {
            body: recipe.name.clone(),
            aphelion: r,
            sm_axis: a,
        });
    }
    Ok((r, a))
}

fn required(recipe: &OrbitalRecipe, element: &'static str, value: Option<f64>) -> Result<f64, RecipeError> {
    let value = value.ok_or_else(|| RecipeError::MissingElement {
        body: recipe.name.clone(),
        element,
    })?;
    if !(value.is_finite() && value > 0.0) {
        return Err(RecipeError::NonPositiveElement {
            body: recipe.name.clone(),
            element,
            value,
        });
    }
    Ok(value)
}
