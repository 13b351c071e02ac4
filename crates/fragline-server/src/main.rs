//! Fragline Event Builder Server
//!
//! Main entry point for the fragment ingest and event assembly pipeline.
//!
//! ## Overview
//! The server accepts fragment producers over TCP (one fragment per
//! connection, CRC-trailed), buffers fragments by trigger timestamp, and a
//! builder loop assembles them into combined multi-subsystem events -
//! eagerly when a coherence window is complete, forcibly when its oldest
//! bucket times out.
//!
//! ## Configuration
//! All configuration is done via environment variables:
//!
//! - `FRAGLINE_ADDR`: ingest bind address (default: 0.0.0.0:8080)
//! - `FRAGLINE_WINDOW_NS`: coherence window half-width (default: 1000000)
//! - `FRAGLINE_LATENCY_NS`: straggler grace period (default: 200000000)
//! - `FRAGLINE_POLL_MS`: builder tick cadence (default: 100)
//! - `FRAGLINE_MERGE`: fold partial events into the merger (any value)
//!
//! ## Logging
//! Logging is controlled via the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=debug cargo run -p fragline-server    # Detailed logs
//! RUST_LOG=info cargo run -p fragline-server     # Standard logs (default)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fragline_buffer::{EventMerger, FragmentBuffer};
use fragline_server::{BuilderLoop, EventSink, IngestServer, ServerConfig};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("fragline server starting");
    tracing::info!("  Ingest: {}", config.bind_addr);
    tracing::info!(
        "  Window: {} ns, latency delay: {} ns, poll: {} ms",
        config.builder.coherence_window_ns,
        config.builder.latency_delay_ns,
        config.builder.poll_interval_ms
    );
    tracing::info!("  Merger: {}", if config.merge_partials { "on" } else { "off" });

    let buffer = Arc::new(FragmentBuffer::with_required(
        config.builder.required_contributors.clone(),
    ));
    let running = Arc::new(AtomicBool::new(true));

    // Ingest side. Bind errors are fatal.
    let ingest = IngestServer::bind(
        &config.bind_addr,
        Arc::clone(&buffer),
        config.accept_wait(),
        config.max_payload_bytes,
    )
    .await?;

    // Builder -> sink channel.
    let (events_tx, events_rx) = mpsc::channel(256);
    let merger = config.merge_partials.then(|| Arc::new(EventMerger::new()));
    let sink = EventSink::new(
        events_rx,
        merger.clone(),
        config.builder.required_contributors.clone(),
    );
    let builder = BuilderLoop::new(Arc::clone(&buffer), config.builder.clone(), events_tx);

    let ingest_handle = tokio::spawn(ingest.run(Arc::clone(&running)));
    let builder_handle = tokio::spawn(builder.run(Arc::clone(&running)));
    let sink_handle = tokio::spawn(sink.run());

    // Cooperative shutdown on SIGINT / SIGTERM.
    let shutdown_flag = Arc::clone(&running);
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown");
            },
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown");
            },
        }
        shutdown_flag.store(false, Ordering::Relaxed);
    });

    ingest_handle.await?;
    builder_handle.await?;
    sink_handle.await?;

    let leftover = buffer.len();
    if leftover > 0 {
        tracing::warn!(fragments = leftover, "fragments left unassembled at shutdown");
    }

    if let Some(merger) = merger {
        for event in merger.snapshot() {
            tracing::info!(
                logical_event_id = event.logical_event_id,
                contributors = event.contributors_present.len(),
                "merged event at shutdown"
            );
        }
    }

    tracing::info!("fragline server shut down");
    Ok(())
}
