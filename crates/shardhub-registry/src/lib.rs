//! World-server membership for the shardhub coordination hub.
//!
//! World servers register under a shard group name. The registry keeps the
//! authoritative list of servers, the groups they belong to, and each
//! server's live [`PresenceStore`](shardhub_session::PresenceStore).
//!
//! # Key types
//!
//! - [`ShardRegistry`]: registers/unregisters servers, resolves presence
//!   across the cluster, builds channel lists
//! - [`WorldServer`]: one registered server and its presence store
//! - [`ShardGroup`]: a named, ordered list of servers
//! - [`Registration`]: what a register call actually did

mod error;
mod group;
mod registry;
mod world;

pub use error::RegistryError;
pub use group::ShardGroup;
pub use registry::{Registration, ShardRegistry};
pub use world::WorldServer;
