//! Event Sink
//!
//! Terminal stage of the server pipeline: consumes assembled events from
//! the builder, emits one report line per event, and optionally folds them
//! into the [`EventMerger`](fragline_buffer::EventMerger) so partial drains
//! of the same logical event are consolidated.

use std::sync::Arc;

use fragline_buffer::EventMerger;
use fragline_core::{CombinedEvent, Contributor};
use tokio::sync::mpsc;
use tracing::info;

/// Consumes the builder's event stream until it closes.
pub struct EventSink {
    events: mpsc::Receiver<CombinedEvent>,
    merger: Option<Arc<EventMerger>>,
    required: Vec<Contributor>,
}

impl EventSink {
    pub fn new(
        events: mpsc::Receiver<CombinedEvent>,
        merger: Option<Arc<EventMerger>>,
        required: Vec<Contributor>,
    ) -> Self {
        Self {
            events,
            merger,
            required,
        }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            let status = if event.is_complete(&self.required) {
                "complete"
            } else {
                "partial"
            };
            let contributors: Vec<String> = event
                .contributors_present
                .iter()
                .map(ToString::to_string)
                .collect();
            info!(
                timestamp = event.timestamp,
                logical_event_id = event.logical_event_id,
                contributors = ?contributors,
                frames = event.total_frames(),
                status,
                "event"
            );

            if let Some(merger) = &self.merger {
                merger.merge(event);
            }
        }
        info!("event stream closed, sink stopped");
    }
}
