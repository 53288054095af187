//! boardingd - boarding gate daemon
//!
//! This daemon:
//! 1. Loads configuration (file named by GATE_CONFIG / --config, then env overrides)
//! 2. Opens the camera source and loads the depth engine once
//! 3. Binds the HMI link
//! 4. Runs trigger -> door check -> crowd check -> command cycles until Ctrl-C
//!
//! If the depth engine cannot be loaded the daemon still serves triggers,
//! answering STOP to every one of them.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use boarding_gate::config::GateConfig;
use boarding_gate::depth::build_engine;
use boarding_gate::{open_source, BoardingGate, DepthEngine, OfflineDepthEngine, UdpHmiLink};

#[derive(Parser, Debug)]
#[command(name = "boardingd", version, about = "Boarding gate daemon")]
struct Args {
    /// Config file (.json or .toml).
    #[arg(long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Camera source override (stub://..., dir://<path>, /dev/videoN).
    #[arg(long)]
    camera: Option<String>,

    /// Depth backend override (stub, offline, tract).
    #[arg(long)]
    depth_backend: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = GateConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = args.camera {
        config.camera.source = camera;
    }
    if let Some(backend) = args.depth_backend {
        config.depth.backend = backend;
    }

    let mut source = open_source(&config.camera, &config.door.roi)?;
    source
        .connect()
        .with_context(|| format!("connect camera {}", config.camera.source))?;

    let engine = load_engine(&config);

    let link = UdpHmiLink::bind(&config.link_config())?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!(
        "boardingd {} running. camera={} depth={} hmi={}",
        env!("CARGO_PKG_VERSION"),
        config.camera.source,
        engine.name(),
        config.network.hmi_addr
    );

    let mut gate = BoardingGate::new(
        source,
        config.door_classifier(),
        engine,
        link,
        config.occupancy_scorer(),
        config.gate_settings(),
    );
    gate.run(&stop);

    log::info!("shutdown signal received, boardingd stopped");
    Ok(())
}

/// Build and warm up the configured engine, falling back to the offline
/// engine (every crowd frame STOP) when that fails.
fn load_engine(config: &GateConfig) -> Box<dyn DepthEngine> {
    let mut engine = match build_engine(&config.depth) {
        Ok(engine) => engine,
        Err(err) => {
            log::error!(
                "depth engine '{}' failed to load: {:#}; every cycle will answer STOP",
                config.depth.backend,
                err
            );
            return Box::new(OfflineDepthEngine::new(err.to_string()));
        }
    };
    if let Err(err) = engine.warm_up() {
        log::error!(
            "depth engine '{}' failed warm-up: {}; every cycle will answer STOP",
            engine.name(),
            err
        );
        return Box::new(OfflineDepthEngine::new(err.to_string()));
    }
    engine
}
