use std::thread;
use std::time::{Duration, Instant};

use crate::configuration::config::{OrbitalRecipe, SimulationConfig};
use crate::simulation::controller::Simulator;
use crate::simulation::error::SimError;
use crate::simulation::forces::AccelSet;
use crate::simulation::integrator::tick;
use crate::simulation::params::Parameters;
use crate::simulation::scenario::Scenario;
use crate::simulation::states::BodyKind;

/// Helper to build a star with `planets` planets, each carrying `moons` moons.
/// Deterministic distances, no rand needed
pub fn make_recipe(planets: usize, moons: usize) -> OrbitalRecipe {
    let sats = (0..planets)
        .map(|p| {
            let p_f = p as f64;
            let distance = 5.0e7 + p_f * 2.5e7;
            OrbitalRecipe {
                name: format!("planet-{p}"),
                kind: BodyKind::Planet,
                mass: 1.0e24 * (1.0 + (p_f * 0.37).sin().abs()),
                radius: 5000.0,
                aphelion: Some(distance * 1.02),
                sm_axis: Some(distance),
                rotation: 0.5,
                far_horizon: None,
                sats: (0..moons)
                    .map(|m| OrbitalRecipe {
                        name: format!("moon-{p}-{m}"),
                        kind: BodyKind::Moon,
                        mass: 1.0e20,
                        radius: 500.0,
                        aphelion: Some(2.0e5 + m as f64 * 5.0e4),
                        sm_axis: Some(2.0e5 + m as f64 * 5.0e4),
                        rotation: 0.0,
                        far_horizon: None,
                        sats: Vec::new(),
                    })
                    .collect(),
            }
        })
        .collect();

    OrbitalRecipe {
        name: "star".to_string(),
        kind: BodyKind::Star,
        mass: 1.9891e30,
        radius: 696342.0,
        aphelion: None,
        sm_axis: None,
        rotation: 0.0,
        far_horizon: None,
        sats,
    }
}

/// Build `recipe` and time `steps` integrator ticks after one warm-up tick.
/// Returns the body count and the mean microseconds per tick.
pub fn time_ticks(recipe: &OrbitalRecipe, forces: &AccelSet, steps: usize) -> Result<(usize, f64), SimError> {
    let parameters = Parameters::default();
    let Scenario { mut root, table } = Scenario::from_recipe(recipe, &parameters, usize::MAX)?;
    let writer = table.claim_writer()?;
    let dt = 1.0 / 60.0;

    // Warm up
    tick(&mut root, dt, forces, &writer)?;

    let t0 = Instant::now();
    for _ in 0..steps {
        tick(&mut root, dt, forces, &writer)?;
    }
    let per_tick = t0.elapsed().as_secs_f64() * 1.0e6 / steps.max(1) as f64;
    Ok((table.len(), per_tick))
}

/// Time one integrator tick for a range of tree sizes
pub fn bench_tick() {
    let shapes = [(8, 0), (8, 8), (64, 4), (128, 16), (256, 32)];
    let steps = 1000;
    let forces = AccelSet::gravity(Parameters::default().G);

    println!("bodies,tick_us");
    for (planets, moons) in shapes {
        match time_ticks(&make_recipe(planets, moons), &forces, steps) {
            Ok((bodies, per_tick)) => println!("{},{:.3}", bodies, per_tick),
            Err(e) => println!("skipping {planets}x{moons}: {e}"),
        }
    }
}

/// Run the threaded worker for a second per target rate and report the
/// rate it actually achieved
pub fn bench_rate() {
    let rates = [30.0, 60.0, 120.0, 240.0, 500.0];
    let window = Duration::from_secs(1);
    let recipe = make_recipe(32, 4);

    println!("target_hz,achieved_hz");
    for hz in rates {
        let cfg = SimulationConfig {
            hz,
            ..SimulationConfig::default()
        };
        let mut sim = match Simulator::new(&cfg) {
            Ok(sim) => sim,
            Err(e) => {
                println!("{hz}: {e}");
                continue;
            }
        };
        if let Err(e) = sim.init_system(&recipe) {
            println!("{hz}: {e}");
            continue;
        }
        if let Err(e) = sim.start() {
            println!("{hz}: {e}");
            continue;
        }
        let Some(table) = sim.state_table() else {
            continue;
        };

        let before = table.ticks();
        let t0 = Instant::now();
        thread::sleep(window);
        let ticks = table.ticks() - before;
        let achieved = ticks as f64 / t0.elapsed().as_secs_f64();
        if let Err(e) = sim.stop() {
            println!("{hz}: {e}");
            continue;
        }

        println!("{},{:.2}", hz, achieved);
    }
}
