//! Simulation lifecycle: build a system, run its worker, answer queries.
//!
//! The integrator runs on a dedicated thread rather than a separate process.
//! A panicking tick is caught at `join` and reported, but a thread shares the
//! caller's address space, so nothing contains memory-level damage the way
//! process isolation would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::configuration::config::{OrbitalRecipe, SimulationConfig};
use crate::simulation::engine::Engine;
use crate::simulation::error::SimError;
use crate::simulation::forces::AccelSet;
use crate::simulation::params::Parameters;
use crate::simulation::scenario::Scenario;
use crate::simulation::states::{BodyState, NVec3, PartialState, SimBody, StateField};
use crate::simulation::table::StateTable;
use crate::simulation::throttle::{run, WorkerContext};

/// Where the controller's worker stands
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerStatus {
    Uninitialized, // no system built
    Ready, // built, never started
    Running,
    Stopped, // stopped cooperatively, resumable
    Crashed(String), // worker died; needs init_system
}

/// A running worker and the handles shared with it
struct SimulatorHandle {
    alive: Arc<AtomicBool>,
    worker: JoinHandle<Result<SimBody, SimError>>,
    table: Arc<StateTable>,
}

pub struct Simulator {
    parameters: Parameters,
    engine: Engine,
    forces: Arc<AccelSet>,
    root: Option<SimBody>, // held here whenever no worker owns it
    table: Option<Arc<StateTable>>,
    handle: Option<SimulatorHandle>,
    status: WorkerStatus,
    unreported: Option<SimError>, // crash seen by status, owed to the next stop
}

impl Simulator {
    /// Controller with parent gravity as the only force
    pub fn new(cfg: &SimulationConfig) -> Result<Self, SimError> {
        cfg.validate().map_err(SimError::InvalidConfig)?;
        let parameters = Parameters::from(cfg);
        let forces = AccelSet::gravity(parameters.G);
        Ok(Self::assemble(cfg, parameters, forces))
    }

    /// Controller with a caller-supplied force set
    pub fn with_forces(cfg: &SimulationConfig, forces: AccelSet) -> Result<Self, SimError> {
        cfg.validate().map_err(SimError::InvalidConfig)?;
        Ok(Self::assemble(cfg, Parameters::from(cfg), forces))
    }

    fn assemble(cfg: &SimulationConfig, parameters: Parameters, forces: AccelSet) -> Self {
        Self {
            parameters,
            engine: Engine::from(cfg),
            forces: Arc::new(forces),
            root: None,
            table: None,
            handle: None,
            status: WorkerStatus::Uninitialized,
            unreported: None,
        }
    }

    /// Stop any running worker, then build the tree and state table for
    /// `recipe`. Does not start ticking.
    pub fn init_system(&mut self, recipe: &OrbitalRecipe) -> Result<(), SimError> {
        if let Err(e) = self.stop() {
            warn!("discarding previous system: {e}");
        }
        self.root = None;
        self.table = None;
        self.status = WorkerStatus::Uninitialized;

        let scenario = Scenario::from_recipe(recipe, &self.parameters, self.engine.max_bodies)?;
        let census = recipe.census();
        info!(
            "system `{}` initialised: {} stars, {} planets, {} moons, {} other",
            recipe.name, census.stars, census.planets, census.moons, census.other
        );
        self.root = Some(scenario.root);
        self.table = Some(scenario.table);
        self.status = WorkerStatus::Ready;
        Ok(())
    }

    /// Launch the worker on the built tree
    pub fn start(&mut self) -> Result<(), SimError> {
        if self.is_running() {
            return Err(SimError::AlreadyRunning);
        }
        let table = self.table.clone().ok_or(SimError::NotInitialized)?;
        let writer = table.claim_writer()?;
        let root = self.root.take().ok_or(SimError::NotInitialized)?;

        let alive = Arc::new(AtomicBool::new(true));
        let ctx = WorkerContext {
            alive: Arc::clone(&alive),
            writer,
            forces: Arc::clone(&self.forces),
            engine: self.engine.clone(),
        };
        let worker = thread::Builder::new()
            .name(format!("solex-{}", root.name))
            .spawn(move || run(root, ctx))
            .map_err(|e| SimError::WorkerFailure(format!("could not spawn worker: {e}")))?;

        self.handle = Some(SimulatorHandle { alive, worker, table });
        self.status = WorkerStatus::Running;
        Ok(())
    }

    /// Signal the worker and wait for it. A no-op when nothing is running.
    ///
    /// Returns `WorkerFailure` once if the worker had crashed, even when
    /// [`Simulator::status`] noticed the crash first. The crash stays visible
    /// through `status`.
    pub fn stop(&mut self) -> Result<(), SimError> {
        let Some(handle) = self.handle.take() else {
            return self.unreported.take().map_or(Ok(()), Err);
        };
        handle.alive.store(false, Ordering::Release);
        self.reap(handle)
    }

    /// Current worker status. Detects a worker that exited on its own.
    pub fn status(&mut self) -> WorkerStatus {
        let finished = self
            .handle
            .as_ref()
            .is_some_and(|h| h.worker.is_finished());
        if finished {
            if let Some(handle) = self.handle.take() {
                // A worker only leaves its loop early by failing
                let failure = match self.reap(handle) {
                    Ok(()) => self.crashed("worker exited while still marked alive".to_string()),
                    Err(e) => e,
                };
                self.unreported = Some(failure);
            }
        }
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    fn reap(&mut self, handle: SimulatorHandle) -> Result<(), SimError> {
        let ticks = handle.table.ticks();
        match handle.worker.join() {
            Ok(Ok(root)) => {
                info!("worker for `{}` stopped after {ticks} ticks", root.name);
                self.root = Some(root);
                self.status = WorkerStatus::Stopped;
                Ok(())
            }
            Ok(Err(e)) => Err(self.crashed(e.to_string())),
            Err(payload) => {
                let reason = if let Some(s) = payload.downcast_ref::<&str>() {
                    format!("panic: {s}")
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    format!("panic: {s}")
                } else {
                    "panic".to_string()
                };
                Err(self.crashed(reason))
            }
        }
    }

    fn crashed(&mut self, reason: String) -> SimError {
        warn!("integrator worker crashed: {reason}");
        self.status = WorkerStatus::Crashed(reason.clone());
        SimError::WorkerFailure(reason)
    }

    /// Bodies strictly within `radius` of `origin`
    pub fn get_state(&self, origin: &NVec3, radius: f64) -> Result<HashMap<String, BodyState>, SimError> {
        Ok(self.table()?.read_all_within(origin, radius))
    }

    /// Bodies within their own proximity horizon of `origin`
    pub fn get_visible_state(&self, origin: &NVec3) -> Result<HashMap<String, BodyState>, SimError> {
        Ok(self.table()?.read_visible(origin))
    }

    pub fn get_body_state(&self, body_id: &str) -> Result<BodyState, SimError> {
        self.table()?.read(body_id)
    }

    pub fn get_body_fields(&self, body_id: &str, fields: &[StateField]) -> Result<PartialState, SimError> {
        self.table()?.read_fields(body_id, fields)
    }

    /// Shared handle on the current state table
    pub fn state_table(&self) -> Option<Arc<StateTable>> {
        self.table.clone()
    }

    /// The body tree, while no worker holds it
    pub fn tree(&self) -> Option<&SimBody> {
        self.root.as_ref()
    }

    fn table(&self) -> Result<&StateTable, SimError> {
        self.table.as_deref().ok_or(SimError::NotInitialized)
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("simulator dropped: {e}");
        }
    }
}
