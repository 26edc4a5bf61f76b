use solex::{bench_rate, bench_tick};
use solex::{NVec3, Simulator, SystemConfig, WorkerStatus};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Headless solar-system simulator: ticks the system and logs the bodies
/// near a viewpoint
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// System file, looked up under `systems/` unless it is a path
    #[arg(short, default_value = "sol.yaml")]
    file_name: String,

    /// Seconds to run before stopping
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// How often to report nearby bodies
    #[arg(long, default_value_t = 2.0)]
    report_hz: f64,

    /// Body to use as the viewpoint (defaults to the system root)
    #[arg(long)]
    near: Option<String>,

    /// Report bodies within this distance of the viewpoint instead of using
    /// each body's own horizon
    #[arg(long)]
    radius: Option<f64>,

    /// Run the tick and rate benchmarks instead
    #[arg(long, default_value_t = false)]
    bench: bool,
}

// load here to keep main clean
fn load_system_from_yaml(file_name: &str) -> Result<SystemConfig> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.is_file() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("systems").join(file_name)
    };
    let file = File::open(&config_path).with_context(|| format!("opening {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let system_cfg: SystemConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("parsing {}", config_path.display()))?;
    Ok(system_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_tick();
        bench_rate();
        return Ok(());
    }

    let system_cfg = load_system_from_yaml(&args.file_name)?;
    let viewpoint = args.near.clone().unwrap_or_else(|| system_cfg.system.name.clone());

    let mut sim = Simulator::new(&system_cfg.simulation)?;
    sim.init_system(&system_cfg.system)?;
    sim.start()?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))?;
    }

    let report_every = Duration::from_secs_f64(1.0 / args.report_hz.max(0.01));
    let deadline = Instant::now() + Duration::from_secs_f64(args.seconds.max(0.0));
    while Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        thread::sleep(report_every);

        if let WorkerStatus::Crashed(reason) = sim.status() {
            error!("simulation halted: {reason}");
            bail!("integrator worker crashed: {reason}");
        }

        let origin: NVec3 = sim.get_body_state(&viewpoint)?.position_vec();
        let nearby = match args.radius {
            Some(radius) => sim.get_state(&origin, radius)?,
            None => sim.get_visible_state(&origin)?,
        };

        let mut names: Vec<_> = nearby.keys().collect();
        names.sort();
        println!("-- {} bodies near `{}`", names.len(), viewpoint);
        for name in names {
            let s = &nearby[name];
            println!(
                "{:>12}  pos = ({:.4e}, {:.4e}, {:.4e})  vel = ({:.3e}, {:.3e}, {:.3e})  hpr = ({:.1}, {:.1}, {:.1})",
                name,
                s.position[0], s.position[1], s.position[2],
                s.velocity[0], s.velocity[1], s.velocity[2],
                s.orientation[0], s.orientation[1], s.orientation[2],
            );
        }
    }

    sim.stop()?;
    if let Some(table) = sim.state_table() {
        info!("{} ticks, {:.1} simulated seconds", table.ticks(), table.sim_time());
    }
    Ok(())
}
