//! `HubServer` builder and accept loop.
//!
//! This is the entry point for running a hub. It ties together all the
//! layers: transport → protocol → hub actor.

use std::future::Future;
use std::sync::Arc;

use shardhub_protocol::{Codec, JsonCodec};
use shardhub_transport::{Transport, TransportError, WebSocketTransport};

use crate::actor::{HubHandle, spawn_hub};
use crate::handler::handle_connection;
use crate::{ServerConfig, ShardhubError};

/// Shared server state passed to each connection handler task.
///
/// Holds no hub state itself. That lives in the actor behind `hub`.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) hub: HubHandle,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a hub server.
///
/// # Example
///
/// ```rust,no_run
/// use shardhub::HubServer;
///
/// # async fn run() -> Result<(), shardhub::ShardhubError> {
/// let server = HubServer::builder()
///     .bind("0.0.0.0:7000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct HubServerBuilder {
    config: ServerConfig,
}

impl HubServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and starts the hub actor.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<HubServer<JsonCodec>, ShardhubError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let hub = spawn_hub(&self.config.hub);
        let codec = JsonCodec::with_max_frame_len(self.config.max_frame_len);

        let state = Arc::new(ServerState {
            hub,
            codec,
            config: self.config,
        });

        Ok(HubServer { transport, state })
    }
}

impl Default for HubServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound hub server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct HubServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl HubServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> HubServerBuilder {
        HubServerBuilder::new()
    }
}

impl<C: Codec> HubServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the hub this server fronts.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ShardhubError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// On shutdown the listener stops accepting, pending login tickets are
    /// cleared, and the hub actor is stopped. Connections already being
    /// handled see the hub as unavailable from then on.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ShardhubError> {
        tracing::info!(
            addr = %self.state.config.bind_addr,
            "shard hub running"
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e @ TransportError::Accept(_)) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "caller dropped during handshake");
                    }
                },
            }
        }

        tracing::info!("shard hub shutting down");
        let hub = &self.state.hub;
        let dropped = hub.cleanup().await?;
        let stats = hub.stats().await?;
        tracing::info!(dropped_tickets = dropped, ?stats, "final hub state");
        hub.shutdown().await?;
        Ok(())
    }
}
