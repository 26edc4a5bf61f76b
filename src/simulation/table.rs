//! # Shared state table
//!
//! The table is how the integrator worker hands body kinematics to the rest
//! of the program. It maps a body id to a fixed record of 12 numeric cells:
//!
//! - position (x, y, z) as `f64`
//! - velocity, orientation, spin (x, y, z each) as `f32`
//!
//! Every cell is its own atomic, so a write never takes a lock on the whole
//! record and readers never block the writer.
//!
//! ## Tearing hazard
//!
//! Cells are consistent one at a time, records are not. A reader racing the
//! worker can see a body's new position next to last tick's velocity, or
//! the x of one tick and the y of the next. Consumers polling for display
//! tolerate this; anything needing a coherent snapshot must stop the worker
//! first.
//!
//! ## Ownership
//!
//! The layout (ids, slots, horizons) is fixed at allocation. Only the holder
//! of the [`TableWriter`] obtained from [`StateTable::claim_writer`] may
//! write, and at most one writer exists at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::simulation::error::{RecipeError, SimError};
use crate::simulation::states::{BodyState, NVec3, PartialState, SimBody, StateField};

/// `f64` cell stored as its bit pattern
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// `f32` cell stored as its bit pattern
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

fn load3(cells: &[AtomicF32; 3]) -> [f32; 3] {
    [cells[0].load(), cells[1].load(), cells[2].load()]
}

fn store3(cells: &[AtomicF32; 3], values: [f32; 3]) {
    for (cell, v) in cells.iter().zip(values) {
        cell.store(v);
    }
}

#[derive(Debug)]
struct Record {
    name: String,
    horizon: f64, // computed once at build time
    position: [AtomicF64; 3],
    velocity: [AtomicF32; 3],
    orientation: [AtomicF32; 3],
    spin: [AtomicF32; 3],
}

impl Record {
    fn new(name: String, horizon: f64) -> Self {
        Self {
            name,
            horizon,
            position: Default::default(),
            velocity: Default::default(),
            orientation: Default::default(),
            spin: Default::default(),
        }
    }

    fn position(&self) -> NVec3 {
        NVec3::new(self.position[0].load(), self.position[1].load(), self.position[2].load())
    }

    fn load(&self) -> BodyState {
        BodyState {
            position: [self.position[0].load(), self.position[1].load(), self.position[2].load()],
            velocity: load3(&self.velocity),
            orientation: load3(&self.orientation),
            spin: load3(&self.spin),
        }
    }

    fn store(&self, state: &BodyState) {
        for (cell, v) in self.position.iter().zip(state.position) {
            cell.store(v);
        }
        store3(&self.velocity, state.velocity);
        store3(&self.orientation, state.orientation);
        store3(&self.spin, state.spin);
    }
}

#[derive(Debug)]
pub struct StateTable {
    index: HashMap<String, usize>,
    records: Vec<Record>,
    ticks: AtomicU64, // completed ticks
    sim_time: AtomicF64, // simulated seconds integrated so far
    writer: AtomicBool, // set while a TableWriter is alive
}

impl StateTable {
    /// Allocate zeroed records for `(body_id, horizon)` pairs.
    /// Slots follow iteration order.
    pub fn allocate<I, S>(bodies: I) -> Result<Self, RecipeError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut index = HashMap::new();
        let mut records = Vec::new();
        for (name, horizon) in bodies {
            let name = name.into();
            if index.insert(name.clone(), records.len()).is_some() {
                return Err(RecipeError::DuplicateName(name));
            }
            records.push(Record::new(name, horizon));
        }
        Ok(Self {
            index,
            records,
            ticks: AtomicU64::new(0),
            sim_time: AtomicF64::default(),
            writer: AtomicBool::new(false),
        })
    }

    /// Allocate one record per body of the tree, in slot order, seeded with
    /// each body's initial state
    pub fn from_tree(root: &SimBody) -> Result<Self, RecipeError> {
        let mut bodies = Vec::with_capacity(root.count());
        root.walk(&mut |b| bodies.push(b));
        bodies.sort_by_key(|b| b.slot);

        let table = Self::allocate(bodies.iter().map(|b| (b.name.clone(), b.horizon)))?;
        for b in &bodies {
            table.records[b.slot].store(&b.state());
        }
        Ok(table)
    }

    /// Take the single writer slot. Fails while another writer is alive.
    pub fn claim_writer(self: &Arc<Self>) -> Result<TableWriter, SimError> {
        self.writer
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SimError::WriterClaimed)?;
        Ok(TableWriter {
            table: Arc::clone(self),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn horizon(&self, body_id: &str) -> Result<f64, SimError> {
        Ok(self.record(body_id)?.horizon)
    }

    /// Number of ticks published so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Simulated seconds integrated so far
    pub fn sim_time(&self) -> f64 {
        self.sim_time.load()
    }

    pub fn read(&self, body_id: &str) -> Result<BodyState, SimError> {
        Ok(self.record(body_id)?.load())
    }

    pub fn read_fields(&self, body_id: &str, fields: &[StateField]) -> Result<PartialState, SimError> {
        let record = self.record(body_id)?;
        let mut out = PartialState::default();
        for field in fields {
            match field {
                StateField::Position => {
                    let p = record.position();
                    out.position = Some([p.x, p.y, p.z]);
                }
                StateField::Velocity => out.velocity = Some(load3(&record.velocity)),
                StateField::Orientation => out.orientation = Some(load3(&record.orientation)),
                StateField::Spin => out.spin = Some(load3(&record.spin)),
            }
        }
        Ok(out)
    }

    /// Bodies strictly within `radius` of `origin`
    pub fn read_all_within(&self, origin: &NVec3, radius: f64) -> HashMap<String, BodyState> {
        self.collect_where(origin, |_, dist| dist < radius)
    }

    /// Bodies within their own proximity horizon of `origin`
    pub fn read_visible(&self, origin: &NVec3) -> HashMap<String, BodyState> {
        self.collect_where(origin, |record, dist| dist < record.horizon)
    }

    fn collect_where(
        &self,
        origin: &NVec3,
        keep: impl Fn(&Record, f64) -> bool,
    ) -> HashMap<String, BodyState> {
        self.records
            .iter()
            .filter(|r| keep(r, (r.position() - origin).norm()))
            .map(|r| (r.name.clone(), r.load()))
            .collect()
    }

    fn record(&self, body_id: &str) -> Result<&Record, SimError> {
        self.index
            .get(body_id)
            .map(|&slot| &self.records[slot])
            .ok_or_else(|| SimError::UnknownBody(body_id.to_string()))
    }
}

/// Exclusive write access to a [`StateTable`], released on drop
#[derive(Debug)]
pub struct TableWriter {
    table: Arc<StateTable>,
}

impl TableWriter {
    pub fn table(&self) -> &Arc<StateTable> {
        &self.table
    }

    pub fn write(&self, body_id: &str, state: &BodyState) -> Result<(), SimError> {
        self.table.record(body_id)?.store(state);
        Ok(())
    }

    /// Write by slot index, as assigned by the tree builder
    pub fn write_slot(&self, slot: usize, state: &BodyState) {
        self.table.records[slot].store(state);
    }

    /// Mark a tick as complete after all of its records were written
    pub fn finish_tick(&self, dt: f64) {
        let t = self.table.sim_time.load();
        self.table.sim_time.store(t + dt);
        self.table.ticks.fetch_add(1, Ordering::Release);
    }
}

impl Drop for TableWriter {
    fn drop(&mut self) {
        self.table.writer.store(false, Ordering::Release);
    }
}
