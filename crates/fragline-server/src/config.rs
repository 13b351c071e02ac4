//! Server Configuration
//!
//! Controls the ingest endpoint and the builder loop's timing policy.
//!
//! ## BuilderConfig
//!
//! - **coherence_window_ns**: half-width of the symmetric grouping window
//!   around the assembly anchor (default: 1 ms)
//! - **latency_delay_ns**: grace period subtracted from the wall clock
//!   before a bucket is considered at all; absorbs producer and network
//!   jitter (default: 200 ms)
//! - **poll_interval_ms**: builder tick cadence (default: 100 ms)
//! - **required_contributors**: subsystems a non-forced assembly must cover
//!   (default: all three)
//!
//! ## Environment
//!
//! The server binary overrides defaults from the environment:
//!
//! - `FRAGLINE_ADDR`: ingest bind address (default: 0.0.0.0:8080)
//! - `FRAGLINE_WINDOW_NS`, `FRAGLINE_LATENCY_NS`, `FRAGLINE_POLL_MS`
//! - `FRAGLINE_MERGE`: feed partial events into the merger (any value)

use std::time::Duration;

use fragline_core::Contributor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Coherence window half-width in nanoseconds (default: 1 ms)
    #[serde(default = "default_window_ns")]
    pub coherence_window_ns: i64,

    /// Straggler grace period in nanoseconds (default: 200 ms)
    #[serde(default = "default_latency_ns")]
    pub latency_delay_ns: i64,

    /// Builder tick cadence in milliseconds (default: 100)
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,

    /// Subsystems required for a complete assembly (default: all)
    #[serde(default = "default_required")]
    pub required_contributors: Vec<Contributor>,
}

impl BuilderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            coherence_window_ns: default_window_ns(),
            latency_delay_ns: default_latency_ns(),
            poll_interval_ms: default_poll_ms(),
            required_contributors: default_required(),
        }
    }
}

fn default_window_ns() -> i64 {
    1_000_000 // 1 ms
}

fn default_latency_ns() -> i64 {
    200_000_000 // 200 ms
}

fn default_poll_ms() -> u64 {
    100
}

fn default_required() -> Vec<Contributor> {
    Contributor::ALL.to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Ingest bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Bounded accept wait so shutdown is observed between accepts
    /// (default: 1000 ms)
    #[serde(default = "default_accept_wait_ms")]
    pub accept_wait_ms: u64,

    /// Cap on a declared payload size, enforced before allocation
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,

    /// Feed assembled events into the merger stage
    #[serde(default)]
    pub merge_partials: bool,

    #[serde(default)]
    pub builder: BuilderConfig,
}

impl ServerConfig {
    pub fn accept_wait(&self) -> Duration {
        Duration::from_millis(self.accept_wait_ms)
    }

    /// Build a config from `FRAGLINE_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("FRAGLINE_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(window) = env_parse("FRAGLINE_WINDOW_NS") {
            config.builder.coherence_window_ns = window;
        }
        if let Some(latency) = env_parse("FRAGLINE_LATENCY_NS") {
            config.builder.latency_delay_ns = latency;
        }
        if let Some(poll) = env_parse("FRAGLINE_POLL_MS") {
            config.builder.poll_interval_ms = poll;
        }
        config.merge_partials = std::env::var("FRAGLINE_MERGE").is_ok();
        config
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            accept_wait_ms: default_accept_wait_ms(),
            max_payload_bytes: default_max_payload_bytes(),
            merge_partials: false,
            builder: BuilderConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_accept_wait_ms() -> u64 {
    1_000
}

fn default_max_payload_bytes() -> u64 {
    fragline_core::wire::DEFAULT_MAX_PAYLOAD_BYTES
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}
