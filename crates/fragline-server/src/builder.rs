//! Builder Loop
//!
//! The single consumer of the fragment buffer. Each tick it computes a
//! reference time `now - latency_delay` - the latency delay is the grace
//! period for straggler fragments - and asks the buffer for a drain:
//!
//! 1. **Expiry first.** If the oldest bucket has aged out, drain it
//!    forcibly, completeness be damned. Without this path a single missing
//!    subsystem would wedge the head of the buffer and block every newer
//!    complete event behind it.
//! 2. **Complete otherwise.** Drain the window around the reference time
//!    only when all required subsystems are represented.
//!
//! Drained sets go through the assembler; the combined event is forwarded
//! over an mpsc channel to the sink. An assembly failure (undecodable
//! payload inside a drain) is reported and the drain discarded - the loop
//! itself never stops for bad data.
//!
//! The loop is poll-based rather than signal-driven so expiry is observed
//! without producer cooperation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fragline_buffer::{assemble, FragmentBuffer};
use fragline_core::CombinedEvent;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::BuilderConfig;

/// Wall clock in nanoseconds since the epoch.
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Periodic scheduler for complete and forced assembly.
pub struct BuilderLoop {
    buffer: Arc<FragmentBuffer>,
    config: BuilderConfig,
    events: mpsc::Sender<CombinedEvent>,
}

impl BuilderLoop {
    pub fn new(
        buffer: Arc<FragmentBuffer>,
        config: BuilderConfig,
        events: mpsc::Sender<CombinedEvent>,
    ) -> Self {
        Self {
            buffer,
            config,
            events,
        }
    }

    /// Poll the buffer until the shutdown flag clears.
    pub async fn run(self, running: Arc<AtomicBool>) {
        let window = self.config.coherence_window_ns;
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            window_ns = window,
            latency_ns = self.config.latency_delay_ns,
            poll_ms = self.config.poll_interval_ms,
            "builder loop started"
        );

        while running.load(Ordering::Relaxed) {
            ticker.tick().await;

            let reference_time = now_ns() - self.config.latency_delay_ns;

            let depth = self.buffer.len();
            if depth > 0 {
                tracing::debug!(depth, "builder tick");
            }

            let drained = if self.buffer.has_expired(reference_time, window) {
                self.buffer.try_assemble(reference_time, window, true)
            } else {
                self.buffer.try_assemble(reference_time, window, false)
            };

            let Some(fragments) = drained else { continue };
            let drained_count = fragments.len();

            match assemble(fragments) {
                Ok(event) => {
                    if event.is_complete(&self.config.required_contributors) {
                        info!(
                            timestamp = event.timestamp,
                            logical_event_id = event.logical_event_id,
                            fragments = drained_count,
                            "assembled complete event"
                        );
                    } else {
                        info!(
                            timestamp = event.timestamp,
                            logical_event_id = event.logical_event_id,
                            fragments = drained_count,
                            "assembled incomplete event on timeout"
                        );
                    }
                    if self.events.send(event).await.is_err() {
                        warn!("event channel closed, builder loop stopping");
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, fragments = drained_count, "drain discarded");
                }
            }
        }

        info!("builder loop stopped");
    }
}
