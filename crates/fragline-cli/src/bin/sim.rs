//! fragline-sim - randomized traffic driver
//!
//! Drives a running ingest endpoint with simulated multi-subsystem traffic,
//! for load testing and end-to-end checks of a deployed builder.
//!
//! ## Usage
//! ```bash
//! fragline-sim --addr 127.0.0.1:8080 --events 50
//! fragline-sim --seed 7          # reproducible run
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use fragline_client::{Simulator, SimulatorConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fragline-sim", about = "Drive an ingest endpoint with simulated traffic")]
struct Args {
    /// Ingest endpoint to send to
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Number of simulated events
    #[arg(long, default_value_t = 50)]
    events: u32,

    /// Max fragments per event and subsystem
    #[arg(long, default_value_t = 20)]
    max_fragments: u32,

    /// Max frames per fragment
    #[arg(long, default_value_t = 50)]
    max_frames: u32,

    /// Mean inter-event gap in milliseconds
    #[arg(long, default_value_t = 500.0)]
    mean_gap_ms: f64,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let config = SimulatorConfig {
        target_addr: args.addr,
        events: args.events,
        max_fragments_per_contributor: args.max_fragments,
        max_frames_per_fragment: args.max_frames,
        mean_event_gap_ms: args.mean_gap_ms,
        ..Default::default()
    };

    let simulator = match args.seed {
        Some(seed) => Simulator::with_seed(config, seed),
        None => Simulator::new(config),
    };

    let running = Arc::new(AtomicBool::new(true));
    let ctrl_c_flag = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, finishing current event");
            ctrl_c_flag.store(false, Ordering::Relaxed);
        }
    });

    match simulator.run(running).await {
        Ok(report) => {
            info!(
                events = report.events_simulated,
                fragments = report.fragments_sent,
                "simulation complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("fragline-sim: {e}");
            ExitCode::from(1)
        }
    }
}
