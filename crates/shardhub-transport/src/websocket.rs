//! WebSocket transport on `tokio-tungstenite`.
//!
//! Each accepted stream is split. The sink and the stream sit behind
//! separate locks, so the handler task can wait in `recv` while the same
//! task's event branch, or a reply, writes to the sink.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// How long a fresh TCP connection gets to complete the upgrade.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<TcpStream>;

/// Listens for world servers and gateways.
pub struct WebSocketTransport {
    listener: TcpListener,
    next_id: AtomicU64,
}

impl WebSocketTransport {
    /// Binds the listener. Port 0 picks a free port; read it back with
    /// [`Transport::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            TransportError::Bind {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(addr, "websocket listener bound");

        Ok(Self {
            listener,
            next_id: AtomicU64::new(1),
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (tcp, peer) =
            self.listener.accept().await.map_err(TransportError::Accept)?;

        let ws = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            tokio_tungstenite::accept_async(tcp),
        )
        .await
        .map_err(|_| TransportError::HandshakeTimeout {
            peer,
            after: HANDSHAKE_TIMEOUT,
        })?
        .map_err(|e| TransportError::Handshake {
            peer,
            source: Box::new(e),
        })?;

        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "websocket upgraded");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            opened: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// An upgraded connection to one caller.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    opened: Instant,
    /// Milliseconds after `opened` that the last frame arrived.
    last_seen_ms: AtomicU64,
}

impl WebSocketConnection {
    fn touch(&self) {
        let elapsed = self.opened.elapsed().as_millis();
        let elapsed = u64::try_from(elapsed).unwrap_or(u64::MAX);
        self.last_seen_ms.fetch_max(elapsed, Ordering::Relaxed);
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let frame = Message::Binary(data.to_vec().into());
        self.sink
            .lock()
            .await
            .send(frame)
            .await
            .map_err(|e| map_ws_error(e, TransportError::Send))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            if frame.is_ok() {
                self.touch();
            }
            match frame {
                Ok(Message::Binary(data)) => return Ok(Some(data.to_vec())),
                Ok(Message::Text(text)) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Ok(Message::Close(frame)) => {
                    tracing::trace!(id = %self.id, ?frame, "close frame");
                    return Ok(None);
                }
                // tungstenite answers pings itself; `touch` above has
                // already counted them as activity.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => {
                    return match map_ws_error(e, TransportError::Receive) {
                        TransportError::Closed => Ok(None),
                        other => Err(other),
                    };
                }
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| map_ws_error(e, TransportError::Send))
    }

    fn last_activity(&self) -> Instant {
        let ms = self.last_seen_ms.load(Ordering::Relaxed);
        self.opened + Duration::from_millis(ms)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Maps a tungstenite error, folding the "already gone" cases into
/// [`TransportError::Closed`].
fn map_ws_error(
    e: tungstenite::Error,
    wrap: fn(crate::BoxError) -> TransportError,
) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed => TransportError::Closed,
        other => wrap(Box::new(other)),
    }
}
