//! Error types for the registry layer.

use shardhub_protocol::{Endpoint, WorldId};

/// Errors that can occur during membership operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No registered world server has this id.
    #[error("world server {0} not found")]
    WorldNotFound(WorldId),

    /// No registered world server listens on this endpoint.
    #[error("no world server registered at {0}")]
    EndpointNotFound(Endpoint),

    /// The endpoint already belongs to a different shard group.
    #[error("endpoint {endpoint} is already registered in group {group}")]
    EndpointInUse { endpoint: Endpoint, group: String },

    /// Another endpoint already registered with this world id.
    #[error("world id {0} is already registered")]
    WorldIdInUse(WorldId),
}
