//! Fixed-rate worker loop around the integrator
//!
//! The loop ticks at a target rate, independent of whoever is reading the
//! state table. Each period: tick, then sleep out what is left of the period.
//! The liveness flag is checked between ticks only; a tick in progress always
//! completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use super::engine::Engine;
use super::error::SimError;
use super::forces::AccelSet;
use super::integrator::tick;
use super::states::SimBody;
use super::table::TableWriter;

/// Below this, yield instead of sleeping; OS sleep granularity would overshoot
const SPIN_THRESHOLD: Duration = Duration::from_micros(200);

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    period: Duration,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until one period has passed since `start`.
    ///
    /// Sleeps the remaining time, then re-checks, so a short or interrupted
    /// sleep is topped up and a long one is not compounded.
    pub fn wait(&self, start: Instant) {
        loop {
            let elapsed = start.elapsed();
            if elapsed >= self.period {
                return;
            }
            let remaining = self.period - elapsed;
            if remaining > SPIN_THRESHOLD {
                thread::sleep(remaining - SPIN_THRESHOLD / 2);
            } else {
                thread::yield_now();
            }
        }
    }
}

/// Everything the worker needs besides the tree
pub struct WorkerContext {
    pub alive: Arc<AtomicBool>,
    pub writer: TableWriter,
    pub forces: Arc<AccelSet>,
    pub engine: Engine,
}

/// Tick `root` at the engine's rate until the liveness flag clears.
///
/// Returns the tree on a cooperative stop so the controller can resume it.
/// An integrator error ends the loop and is returned as-is.
pub fn run(mut root: SimBody, ctx: WorkerContext) -> Result<SimBody, SimError> {
    let throttle = Throttle::new(ctx.engine.period());
    info!(
        "worker started: `{}` at {} Hz ({:?} step)",
        root.name, ctx.engine.hz, ctx.engine.step
    );

    let mut previous = Instant::now();
    while ctx.alive.load(Ordering::Acquire) {
        let start = Instant::now();
        let dt = ctx.engine.step_for(start.duration_since(previous).as_secs_f64());
        previous = start;

        tick(&mut root, dt, &ctx.forces, &ctx.writer)?;

        throttle.wait(start);
    }

    debug!("worker stopping after {} ticks", ctx.writer.table().ticks());
    Ok(root)
}
