//! Error types for the hub and the server around it.

use std::time::Duration;

use shardhub_protocol::ProtocolError;
use shardhub_registry::RegistryError;
use shardhub_session::SessionError;
use shardhub_transport::TransportError;

use crate::ConfigError;

/// How a failed operation should be treated at the wire boundary.
///
/// Every kind ends up as the same `false`/`null`/acknowledgement for the
/// caller. The kind only decides how loudly the hub logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required identifier was missing or empty. Logged as a warning.
    Invalid,
    /// Nothing to act on: already disconnected, already unregistered, no
    /// such ticket. Benign.
    NotFound,
    /// The request collides with existing state (duplicate login,
    /// duplicate character, endpoint in another group).
    Conflict,
    /// Anything else. Logged as an error with full context.
    Internal,
}

/// Errors produced by hub operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A presence or ticket operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A membership operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The request was missing a required identifier.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The hub actor has stopped.
    #[error("hub is unavailable")]
    Unavailable,

    /// The hub didn't answer in time.
    #[error("hub did not answer within {0:?}")]
    Timeout(Duration),

    /// The hub panicked while applying the named operation.
    #[error("hub faulted while handling {0}")]
    Fault(&'static str),
}

impl HubError {
    /// Classifies this error for the wire boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(e) => match e {
                SessionError::AccountAlreadyConnected(_)
                | SessionError::CharacterAlreadyConnected(_) => {
                    ErrorKind::Conflict
                }
                SessionError::AccountNotConnected(_)
                | SessionError::CharacterNotConnected(_)
                | SessionError::NoPendingTicket(_) => ErrorKind::NotFound,
            },
            Self::Registry(e) => match e {
                RegistryError::WorldNotFound(_)
                | RegistryError::EndpointNotFound(_) => ErrorKind::NotFound,
                RegistryError::EndpointInUse { .. }
                | RegistryError::WorldIdInUse(_) => ErrorKind::Conflict,
            },
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Unavailable | Self::Timeout(_) | Self::Fault(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Top-level error that wraps all crate-specific errors.
///
/// Surfaces from server setup and connection handling. Hub operations
/// themselves never produce one of these for a caller to see.
#[derive(Debug, thiserror::Error)]
pub enum ShardhubError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A hub operation failed.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The configuration couldn't be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use shardhub_protocol::{AccountName, Endpoint, WorldId};

    use super::*;

    #[test]
    fn test_kind_duplicate_login_is_conflict() {
        let err: HubError =
            SessionError::AccountAlreadyConnected(AccountName::new("bob"))
                .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_kind_missing_ticket_is_not_found() {
        let err: HubError =
            SessionError::NoPendingTicket(AccountName::new("bob")).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_registry_errors() {
        let missing: HubError =
            RegistryError::EndpointNotFound(Endpoint::new("h", 1)).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let taken: HubError = RegistryError::WorldIdInUse(WorldId(1)).into();
        assert_eq!(taken.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_kind_actor_failures_are_internal() {
        assert_eq!(HubError::Unavailable.kind(), ErrorKind::Internal);
        assert_eq!(
            HubError::Timeout(Duration::from_millis(5)).kind(),
            ErrorKind::Internal
        );
        assert_eq!(HubError::Fault("Cleanup").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_from_transport_error() {
        let top: ShardhubError = TransportError::Closed.into();
        assert!(matches!(top, ShardhubError::Transport(_)));
        assert_eq!(top.to_string(), "connection closed");
    }

    #[test]
    fn test_from_hub_error_keeps_message() {
        let top: ShardhubError = HubError::Invalid("empty".into()).into();
        assert_eq!(top.to_string(), "invalid request: empty");
    }
}
