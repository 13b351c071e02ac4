//! Traffic Simulator
//!
//! Drives an ingest endpoint with randomized multi-subsystem traffic: per
//! simulated event, each subsystem contributes a random number of fragments,
//! each carrying a random number of frames, all stamped with the same
//! simulated trigger time. Events are spaced by exponentially distributed
//! gaps so bursts and quiet stretches both occur, the way real triggers do.
//!
//! The simulator advances its own nanosecond clock for trigger timestamps
//! and paces real transmission with the same gaps, so the builder's
//! wall-clock latency handling is exercised realistically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fragline_core::{encode_payload, Contributor, Fragment, Frame, SubsystemPayload};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::Result;
use crate::sender::FragmentSender;

/// Tunables for one simulation run.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Ingest endpoint to send to.
    pub target_addr: String,

    /// Number of simulated events.
    pub events: u32,

    /// Per event and subsystem, fragments drawn from `0..=this`.
    pub max_fragments_per_contributor: u32,

    /// Per fragment, frames drawn from `0..=this`.
    pub max_frames_per_fragment: u32,

    /// Words per generated frame.
    pub words_per_frame: u32,

    /// Mean of the exponential inter-event gap, in milliseconds.
    pub mean_event_gap_ms: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            target_addr: "127.0.0.1:8080".to_string(),
            events: 50,
            max_fragments_per_contributor: 20,
            max_frames_per_fragment: 50,
            words_per_frame: 4,
            mean_event_gap_ms: 500.0,
        }
    }
}

/// Outcome counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub events_simulated: u32,
    pub fragments_sent: u64,
}

/// Randomized traffic generator for one ingest endpoint.
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for reproducible runs.
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run to completion or until `running` is cleared.
    pub async fn run(mut self, running: Arc<AtomicBool>) -> Result<SimulationReport> {
        let sender = FragmentSender::new(self.config.target_addr.clone());
        let mut report = SimulationReport::default();
        let mut clock_ns: i64 = 0;

        for event in 1..=self.config.events {
            if !running.load(Ordering::Relaxed) {
                info!(event, "simulation stopped by shutdown flag");
                break;
            }

            let gap_ns = self.next_gap_ns();
            clock_ns += gap_ns;

            let mut fragments = Vec::new();
            for contributor in Contributor::ALL {
                let count = self
                    .rng
                    .gen_range(0..=self.config.max_fragments_per_contributor);
                for _ in 0..count {
                    fragments.push(self.build_fragment(clock_ns, event, contributor));
                }
            }

            debug!(
                event,
                timestamp = clock_ns,
                fragments = fragments.len(),
                "simulating event"
            );
            for fragment in &fragments {
                sender.send(fragment).await?;
                report.fragments_sent += 1;
            }
            report.events_simulated = event;

            tokio::time::sleep(Duration::from_nanos(gap_ns as u64)).await;
        }

        info!(
            events = report.events_simulated,
            fragments = report.fragments_sent,
            "simulation finished"
        );
        Ok(report)
    }

    fn build_fragment(&mut self, timestamp: i64, event: u32, contributor: Contributor) -> Fragment {
        let frame_count = self.rng.gen_range(0..=self.config.max_frames_per_fragment);
        let frames = (0..frame_count)
            .map(|_| {
                let words = (0..self.config.words_per_frame)
                    .map(|_| self.rng.gen::<u32>())
                    .collect();
                Frame::new(words)
            })
            .collect();
        let payload = SubsystemPayload::new(timestamp, frames);
        Fragment::new(timestamp, event, contributor, encode_payload(&payload))
    }

    /// Exponentially distributed gap via inverse-CDF sampling.
    fn next_gap_ns(&mut self) -> i64 {
        let uniform: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let gap_ms = -self.config.mean_event_gap_ms * uniform.ln();
        (gap_ms * 1_000_000.0) as i64
    }
}
