//! Error types for the session layer.

use shardhub_protocol::{AccountName, CharacterName};

/// Errors from presence and ticket operations.
///
/// Two families: conflicts (someone is already there) and not-found
/// (nothing to remove). Callers above decide which ones are benign.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The account already has a live session somewhere in the cluster.
    #[error("account {0} is already connected")]
    AccountAlreadyConnected(AccountName),

    /// The character is already connected on this world server.
    #[error("character {0} is already connected")]
    CharacterAlreadyConnected(CharacterName),

    /// No world server holds a session for this account.
    #[error("account {0} is not connected")]
    AccountNotConnected(AccountName),

    /// No world server holds this character.
    #[error("character {0} is not connected")]
    CharacterNotConnected(CharacterName),

    /// There is no pending login ticket for this account (never issued,
    /// or already redeemed).
    #[error("no pending login ticket for account {0}")]
    NoPendingTicket(AccountName),
}
