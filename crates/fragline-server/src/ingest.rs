//! Ingest Server
//!
//! Accepts producer connections and feeds validated fragments into the
//! shared buffer.
//!
//! ## Connection Contract
//!
//! Each connection delivers exactly one wire message: fixed header, payload,
//! CRC trailer. The server reads each part with all-or-error semantics,
//! verifies the checksum, and only then constructs and enqueues the
//! fragment. A corrupt message is logged and dropped with its connection -
//! no partial state reaches the buffer.
//!
//! ## Shutdown
//!
//! The accept call is wrapped in a bounded timeout so the loop can observe
//! the shutdown flag between accepts; flipping the flag makes the loop exit
//! on its next turn. Connections already being read are driven to
//! completion by their own tasks.
//!
//! ## Error Containment
//!
//! Bind errors are fatal and propagate out of [`IngestServer::bind`].
//! Anything that goes wrong on an accepted connection - short reads, bad
//! tags, oversized payloads, checksum mismatches - closes that connection
//! only.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fragline_buffer::FragmentBuffer;
use fragline_core::wire::{MessageHeader, HEADER_LEN, TRAILER_LEN};
use fragline_core::{Error as CoreError, Fragment};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};

/// TCP front door of the pipeline.
pub struct IngestServer {
    listener: TcpListener,
    buffer: Arc<FragmentBuffer>,
    accept_wait: Duration,
    max_payload_bytes: u64,
}

impl IngestServer {
    /// Bind the listening endpoint. Bind or listen failure is fatal.
    pub async fn bind(
        addr: &str,
        buffer: Arc<FragmentBuffer>,
        accept_wait: Duration,
        max_payload_bytes: u64,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "ingest listener bound");
        Ok(Self {
            listener,
            buffer,
            accept_wait,
            max_payload_bytes,
        })
    }

    /// The actual bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept until the shutdown flag clears.
    pub async fn run(self, running: Arc<AtomicBool>) {
        while running.load(Ordering::Relaxed) {
            let accepted = match timeout(self.accept_wait, self.listener.accept()).await {
                // Accept wait elapsed: loop around and re-check the flag.
                Err(_) => continue,
                Ok(Err(e)) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
                Ok(Ok(accepted)) => accepted,
            };

            let (stream, peer) = accepted;
            let buffer = Arc::clone(&self.buffer);
            let max_payload_bytes = self.max_payload_bytes;
            tokio::spawn(async move {
                match read_fragment(stream, max_payload_bytes).await {
                    Ok(fragment) => {
                        debug!(
                            peer = %peer,
                            timestamp = fragment.timestamp,
                            contributor = %fragment.contributor,
                            payload_bytes = fragment.payload.len(),
                            "fragment accepted"
                        );
                        buffer.add(fragment);
                    }
                    Err(ServerError::Core(e @ CoreError::ChecksumMismatch { .. })) => {
                        warn!(peer = %peer, error = %e, "fragment discarded");
                    }
                    Err(e) => {
                        debug!(peer = %peer, error = %e, "connection dropped");
                    }
                }
            });
        }
        info!("ingest listener stopped");
    }
}

/// Read exactly one wire message off the connection and validate it.
async fn read_fragment(mut stream: TcpStream, max_payload_bytes: u64) -> Result<Fragment> {
    let mut raw_header = [0u8; HEADER_LEN];
    stream.read_exact(&mut raw_header).await?;
    let header = MessageHeader::decode(&raw_header);
    let contributor = header.contributor()?;

    if header.payload_size > max_payload_bytes {
        return Err(CoreError::PayloadTooLarge {
            size: header.payload_size,
            max: max_payload_bytes,
        }
        .into());
    }

    let mut payload = vec![0u8; header.payload_size as usize];
    stream.read_exact(&mut payload).await?;

    let mut raw_crc = [0u8; TRAILER_LEN];
    stream.read_exact(&mut raw_crc).await?;
    let checksum = u32::from_le_bytes(raw_crc);

    let computed = crc32fast::hash(&payload);
    if computed != checksum {
        return Err(CoreError::ChecksumMismatch {
            expected: checksum,
            computed,
        }
        .into());
    }

    Ok(Fragment::with_checksum(
        header.timestamp,
        header.logical_event_id,
        contributor,
        Bytes::from(payload),
        checksum,
    ))
}
