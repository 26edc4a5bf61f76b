//! Per-tick hierarchical integrator
//!
//! Walks the body tree depth-first, parents before children, advancing each
//! body relative to its parent with semi-implicit Euler and publishing the
//! result into the state table. The step `dt` is supplied by the caller and
//! may change from tick to tick.

use log::trace;

use super::error::SimError;
use super::forces::{AccelSet, ParentFrame};
use super::states::{NVec3, SimBody};
use super::table::TableWriter;

/// Advance every body of the tree by `dt` seconds.
///
/// The root is the fixed frame of reference: it is never moved and never
/// republished. Each tick ends with [`TableWriter::finish_tick`].
pub fn tick(root: &mut SimBody, dt: f64, forces: &AccelSet, writer: &TableWriter) -> Result<(), SimError> {
    let frame = ParentFrame::of(root);
    for child in root.children.iter_mut() {
        advance(child, &frame, dt, forces, writer)?;
    }
    writer.finish_tick(dt);
    trace!("tick dt = {dt:.6}s, sim time = {:.3}s", writer.table().sim_time());
    Ok(())
}

fn advance(
    body: &mut SimBody,
    parent: &ParentFrame,
    dt: f64,
    forces: &AccelSet,
    writer: &TableWriter,
) -> Result<(), SimError> {
    // Impulse from this tick's forces: dv = a dt
    let delta = forces.accumulate(body, parent) * dt;
    if !is_finite(&delta) {
        return Err(degenerate(body, "non-finite acceleration"));
    }
    body.delta_velocity = delta;

    // Kick: own impulse plus the parent's, so satellites co-move with an
    // accelerating primary
    body.velocity += body.delta_velocity + parent.delta_velocity;

    // Drift with the updated velocity
    body.position += body.velocity * dt;
    if !is_finite(&body.position) {
        return Err(degenerate(body, "non-finite position"));
    }

    body.orientation = (body.orientation + body.spin * dt).map(wrap_degrees);

    writer.write_slot(body.slot, &body.state());

    let frame = ParentFrame::of(body);
    for child in body.children.iter_mut() {
        advance(child, &frame, dt, forces, writer)?;
    }
    Ok(())
}

fn is_finite(v: &NVec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

fn wrap_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

fn degenerate(body: &SimBody, reason: &str) -> SimError {
    SimError::Degenerate {
        body: body.name.clone(),
        reason: reason.to_string(),
    }
}
