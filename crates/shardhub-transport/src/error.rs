use std::net::SocketAddr;
use std::time::Duration;

/// Boxed source for errors raised by the WebSocket library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from accepting callers and moving frames.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener couldn't be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The TCP accept itself failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// A peer connected but the WebSocket upgrade failed.
    #[error("handshake with {peer} failed: {source}")]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: BoxError,
    },

    /// A peer connected but didn't finish the upgrade in time.
    #[error("handshake with {peer} timed out after {after:?}")]
    HandshakeTimeout { peer: SocketAddr, after: Duration },

    /// The connection is already closed.
    #[error("connection closed")]
    Closed,

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] BoxError),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] BoxError),
}

impl TransportError {
    /// Returns `true` if the error only means the peer has gone away.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
