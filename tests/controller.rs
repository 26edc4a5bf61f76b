use solex::simulation::forces::{AccelSet, Acceleration, ParentFrame};
use solex::simulation::states::{BodyKind, NVec3, SimBody};
use solex::{OrbitalRecipe, SimError, SimulationConfig, Simulator, StepMode, WorkerStatus};

use std::thread;
use std::time::{Duration, Instant};

/// Star with an earth-like planet carrying a moon
pub fn recipe() -> OrbitalRecipe {
    let moon = OrbitalRecipe {
        name: "moon".to_string(),
        kind: BodyKind::Moon,
        mass: 7.342e22,
        radius: 1737.4,
        aphelion: Some(405400.0),
        sm_axis: Some(384399.0),
        rotation: 0.0,
        far_horizon: None,
        sats: Vec::new(),
    };
    let earth = OrbitalRecipe {
        name: "earth".to_string(),
        kind: BodyKind::Planet,
        mass: 5.972e24,
        radius: 6371.0,
        aphelion: Some(152098232.0),
        sm_axis: Some(149598261.0),
        rotation: 0.1,
        far_horizon: None,
        sats: vec![moon],
    };
    OrbitalRecipe {
        name: "sol".to_string(),
        kind: BodyKind::Star,
        mass: 1.9891e30,
        radius: 696342.0,
        aphelion: None,
        sm_axis: None,
        rotation: 0.0,
        far_horizon: None,
        sats: vec![earth],
    }
}

/// Fast tick rate so tests see progress quickly
pub fn config() -> SimulationConfig {
    SimulationConfig {
        hz: 200.0,
        ..SimulationConfig::default()
    }
}

/// Poll `cond` until it holds or two seconds pass
fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

struct Poison;

impl Acceleration for Poison {
    fn acceleration(&self, _body: &SimBody, _parent: &ParentFrame) -> NVec3 {
        NVec3::repeat(f64::NAN)
    }
}

/// Costs a fixed wall time per body so each tick takes longer than its period
struct Sluggish(Duration);

impl Acceleration for Sluggish {
    fn acceleration(&self, _body: &SimBody, _parent: &ParentFrame) -> NVec3 {
        thread::sleep(self.0);
        NVec3::zeros()
    }
}

struct Panicking;

impl Acceleration for Panicking {
    fn acceleration(&self, body: &SimBody, _parent: &ParentFrame) -> NVec3 {
        panic!("force model blew up on {}", body.name);
    }
}

// ==================================================================================
// Lifecycle tests
// ==================================================================================

#[test]
fn invalid_config_is_rejected() {
    let cfg = SimulationConfig {
        hz: 0.0,
        ..SimulationConfig::default()
    };
    assert!(matches!(Simulator::new(&cfg), Err(SimError::InvalidConfig(_))));

    let cfg = SimulationConfig {
        max_dt: Some(-1.0),
        ..SimulationConfig::default()
    };
    assert!(matches!(Simulator::new(&cfg), Err(SimError::InvalidConfig(_))));
}

#[test]
fn queries_before_init_fail() {
    let mut sim = Simulator::new(&config()).unwrap();
    assert_eq!(sim.status(), WorkerStatus::Uninitialized);
    assert_eq!(sim.get_body_state("earth").unwrap_err(), SimError::NotInitialized);
    assert_eq!(sim.start().unwrap_err(), SimError::NotInitialized);
}

#[test]
fn init_does_not_start_ticking() {
    let mut sim = Simulator::new(&config()).unwrap();
    sim.init_system(&recipe()).unwrap();
    assert_eq!(sim.status(), WorkerStatus::Ready);
    assert!(!sim.is_running());

    let table = sim.state_table().unwrap();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(table.ticks(), 0);
    assert_eq!(sim.tree().unwrap().count(), 3);
}

#[test]
fn unknown_body_query_fails() {
    let mut sim = Simulator::new(&config()).unwrap();
    sim.init_system(&recipe()).unwrap();
    assert_eq!(
        sim.get_body_state("nonexistent").unwrap_err(),
        SimError::UnknownBody("nonexistent".to_string())
    );
}

#[test]
fn bad_recipe_leaves_simulator_uninitialised() {
    let mut sim = Simulator::new(&config()).unwrap();
    let mut bad = recipe();
    bad.sats[0].mass = 0.0;
    assert!(matches!(sim.init_system(&bad), Err(SimError::Recipe(_))));
    assert_eq!(sim.status(), WorkerStatus::Uninitialized);
    assert!(sim.state_table().is_none());
}

#[test]
fn start_runs_and_stop_hands_back_the_tree() {
    let mut sim = Simulator::new(&config()).unwrap();
    sim.init_system(&recipe()).unwrap();
    let start_x = sim.get_body_state("earth").unwrap().position[0];

    sim.start().unwrap();
    assert_eq!(sim.status(), WorkerStatus::Running);
    assert!(sim.tree().is_none());

    let table = sim.state_table().unwrap();
    assert!(eventually(|| table.ticks() >= 5), "worker never ticked");
    assert_eq!(sim.start().unwrap_err(), SimError::AlreadyRunning);

    sim.stop().unwrap();
    assert_eq!(sim.status(), WorkerStatus::Stopped);

    let earth = sim.tree().unwrap().find("earth").unwrap();
    let published = sim.get_body_state("earth").unwrap();
    assert_eq!(published.position, [earth.position.x, earth.position.y, earth.position.z]);
    assert!(published.position[1] > 0.0, "earth did not advance along its orbit");
    assert!(published.position[0] <= start_x);
}

#[test]
fn stop_is_idempotent() {
    let mut sim = Simulator::new(&config()).unwrap();
    assert!(sim.stop().is_ok());

    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();
    sim.stop().unwrap();
    let table = sim.state_table().unwrap();
    let ticks = table.ticks();

    assert!(sim.stop().is_ok());
    assert_eq!(sim.status(), WorkerStatus::Stopped);
    assert_eq!(table.ticks(), ticks);
}

#[test]
fn stopped_simulation_resumes() {
    let mut sim = Simulator::new(&config()).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();
    let table = sim.state_table().unwrap();
    assert!(eventually(|| table.ticks() >= 2));
    sim.stop().unwrap();

    let paused_at = table.ticks();
    sim.start().unwrap();
    assert!(eventually(|| table.ticks() > paused_at + 2));
    sim.stop().unwrap();
}

#[test]
fn reinit_while_running_never_leaves_two_writers() {
    let mut sim = Simulator::new(&config()).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();
    let first = sim.state_table().unwrap();
    assert!(eventually(|| first.ticks() >= 2));

    sim.init_system(&recipe()).unwrap();
    // The first worker has been joined, so its writer slot is free again
    assert!(first.claim_writer().is_ok());
    let frozen = first.ticks();

    sim.start().unwrap();
    let second = sim.state_table().unwrap();
    assert!(eventually(|| second.ticks() >= 5));
    assert_eq!(first.ticks(), frozen, "first worker is still writing");

    sim.stop().unwrap();
}

#[test]
fn proximity_queries_delegate_to_the_table() {
    let mut sim = Simulator::new(&config()).unwrap();
    sim.init_system(&recipe()).unwrap();

    let earth = sim.get_body_state("earth").unwrap().position_vec();
    let near = sim.get_state(&earth, 1.0e6).unwrap();
    assert!(near.contains_key("earth") && near.contains_key("moon"));
    assert!(!near.contains_key("sol"));

    let visible = sim.get_visible_state(&earth).unwrap();
    assert!(visible.contains_key("sol"), "star horizon covers 1 AU");

    let fields = sim.get_body_fields("moon", &[solex::StateField::Velocity]).unwrap();
    assert!(fields.velocity.is_some() && fields.position.is_none());
}

#[test]
fn fixed_step_advances_sim_time_by_period() {
    let cfg = SimulationConfig {
        step: StepMode::Fixed,
        ..config()
    };
    let mut sim = Simulator::new(&cfg).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();
    let table = sim.state_table().unwrap();
    assert!(eventually(|| table.ticks() >= 5));
    sim.stop().unwrap();

    let expected = table.ticks() as f64 / cfg.hz;
    assert!((table.sim_time() - expected).abs() < 1e-9);
}

#[test]
fn worker_holds_the_target_rate() {
    let cfg = SimulationConfig {
        hz: 50.0,
        ..SimulationConfig::default()
    };
    let mut sim = Simulator::new(&cfg).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    sim.stop().unwrap();

    // 300 ms at 50 Hz is 15 periods
    let ticks = sim.state_table().unwrap().ticks();
    assert!((10..=20).contains(&ticks), "{ticks} ticks in 300 ms at 50 Hz");
}

#[test]
fn realtime_step_integrates_measured_time() {
    // Two moving bodies at 4 ms each: every tick overruns its 1 ms period
    let cfg = SimulationConfig {
        hz: 1000.0,
        step: StepMode::RealTime,
        ..SimulationConfig::default()
    };
    let forces = AccelSet::new().with(Sluggish(Duration::from_millis(4)));
    let mut sim = Simulator::with_forces(&cfg, forces).unwrap();
    sim.init_system(&recipe()).unwrap();

    let wall = Instant::now();
    sim.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    sim.stop().unwrap();
    let wall = wall.elapsed().as_secs_f64();

    let table = sim.state_table().unwrap();
    let nominal = table.ticks() as f64 / cfg.hz;
    let sim_time = table.sim_time();
    assert!(sim_time <= wall, "sim time {sim_time} ran ahead of wall time {wall}");
    assert!(sim_time > 0.5 * wall, "sim time {sim_time} lags wall time {wall}");
    assert!(sim_time > 4.0 * nominal, "sim time {sim_time} looks like ticks/hz = {nominal}");
}

#[test]
fn realtime_step_is_clamped_by_max_dt() {
    let cfg = SimulationConfig {
        hz: 1000.0,
        step: StepMode::RealTime,
        max_dt: Some(0.002),
        ..SimulationConfig::default()
    };
    let forces = AccelSet::new().with(Sluggish(Duration::from_millis(4)));
    let mut sim = Simulator::with_forces(&cfg, forces).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();
    let table = sim.state_table().unwrap();
    assert!(eventually(|| table.ticks() >= 5));
    sim.stop().unwrap();

    // Every tick after the first overran, so each was clamped to max_dt
    let ticks = table.ticks() as f64;
    assert!(table.sim_time() <= ticks * 0.002 + 1e-9);
    assert!(table.sim_time() >= (ticks - 1.0) * 0.002 - 1e-9);
}

// ==================================================================================
// Worker failure tests
// ==================================================================================

#[test]
fn crashed_worker_is_reported_by_stop() {
    let cfg = config();
    let forces = AccelSet::new().with(Poison);
    let mut sim = Simulator::with_forces(&cfg, forces).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();

    // The writer slot frees up once the worker thread has exited
    let table = sim.state_table().unwrap();
    assert!(eventually(|| table.claim_writer().is_ok()), "worker never died");

    assert!(matches!(sim.stop(), Err(SimError::WorkerFailure(_))));
    assert!(matches!(sim.status(), WorkerStatus::Crashed(_)));

    // Reported once; the crash is not a running worker anymore
    assert!(sim.stop().is_ok());
    assert_eq!(sim.start().unwrap_err(), SimError::NotInitialized);

    // Last published state stays readable
    assert!(sim.get_body_state("earth").is_ok());

    // A fresh init recovers
    sim.init_system(&recipe()).unwrap();
    assert_eq!(sim.status(), WorkerStatus::Ready);
}

#[test]
fn panicking_worker_is_detected_by_status() {
    let forces = AccelSet::new().with(Panicking);
    let mut sim = Simulator::with_forces(&config(), forces).unwrap();
    sim.init_system(&recipe()).unwrap();
    sim.start().unwrap();

    assert!(eventually(|| matches!(sim.status(), WorkerStatus::Crashed(_))));
    match sim.status() {
        WorkerStatus::Crashed(reason) => assert!(reason.contains("panic"), "reason: {reason}"),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(!sim.is_running());

    // status saw the crash first; stop still reports it, once
    match sim.stop() {
        Err(SimError::WorkerFailure(reason)) => assert!(reason.contains("panic"), "reason: {reason}"),
        other => panic!("unexpected stop result {other:?}"),
    }
    assert!(sim.stop().is_ok());
    assert!(matches!(sim.status(), WorkerStatus::Crashed(_)));
}
