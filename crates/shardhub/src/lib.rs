//! # Shardhub
//!
//! Coordination hub for a sharded multiplayer game cluster.
//!
//! World servers register themselves into named shard groups, report who
//! logs in and out, and redeem one-time login tickets written by the
//! gateway. The hub keeps one authoritative view of all of it and enforces
//! the cluster-wide rule that an account is connected to at most one world
//! server at a time.
//!
//! ## Layers
//!
//! - [`Hub`]: the synchronous state and every operation on it
//! - [`HubHandle`]: the actor that serializes access to one `Hub`
//! - [`HubServer`]: WebSocket accept loop, one handler task per caller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shardhub::{HubServer, ServerConfig};
//!
//! # async fn run() -> Result<(), shardhub::ShardhubError> {
//! let config = ServerConfig::load("shardhub.toml")?;
//! let server = HubServer::builder().config(config).build().await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await
//! # }
//! ```

mod actor;
mod broadcast;
mod config;
mod error;
mod handler;
mod hub;
mod logging;
mod server;

pub use actor::{HubHandle, spawn_hub};
pub use broadcast::{Broadcaster, SubscriberId, Subscription};
pub use config::{ConfigError, HubConfig, ServerConfig};
pub use error::{ErrorKind, HubError, ShardhubError};
pub use hub::{Hub, HubStats};
pub use logging::init_logging;
pub use server::{HubServer, HubServerBuilder};
