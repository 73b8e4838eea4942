//! Session tracking for the shardhub coordination hub.
//!
//! This crate holds the two leaf stores of the hub:
//!
//! 1. **Presence**: which accounts and characters have a live session on
//!    one world server ([`PresenceStore`]).
//! 2. **Login tickets**: one-time authorizations that let an account
//!    finish connecting to a world server ([`LoginTickets`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)       ← enforces cluster-wide rules, emits presence events
//!     ↕
//! Registry          ← owns one PresenceStore per world server
//!     ↕
//! Session (this crate)  ← plain maps with single-server semantics
//!     ↕
//! Protocol (below)  ← AccountName, CharacterName, SessionId
//! ```
//!
//! Neither store does any locking. The hub serializes all access.

mod error;
mod presence;
mod tickets;

pub use error::SessionError;
pub use presence::PresenceStore;
pub use tickets::LoginTickets;
