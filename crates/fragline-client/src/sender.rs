//! Fragment Sender
//!
//! Delivers fragments to an ingest endpoint, one TCP connection per
//! fragment. The connection close is the end-of-message signal, so there is
//! no framing beyond the wire message itself.

use fragline_core::{wire, Fragment};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::Result;

/// Producer handle for one ingest endpoint.
#[derive(Debug, Clone)]
pub struct FragmentSender {
    addr: String,
}

impl FragmentSender {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Send one fragment over a fresh connection.
    pub async fn send(&self, fragment: &Fragment) -> Result<()> {
        let message = wire::encode_message(fragment);
        trace!(
            timestamp = fragment.timestamp,
            contributor = %fragment.contributor,
            bytes = message.len(),
            "sending fragment"
        );
        self.send_bytes(&message).await
    }

    /// Send a pre-encoded message verbatim.
    ///
    /// Exists so tests can deliver deliberately corrupt messages; normal
    /// producers go through [`FragmentSender::send`].
    pub async fn send_bytes(&self, message: &[u8]) -> Result<()> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(message).await?;
        stream.shutdown().await?;
        Ok(())
    }
}
