//! The presence store: who is connected to one world server.
//!
//! Every world server registered with the hub owns one `PresenceStore`.
//! It answers two questions about that single server:
//! - which accounts have a live session here, and with which session id
//! - which characters are in the world here, and which account owns them
//!
//! # Scope of the uniqueness rules
//!
//! The store only knows about its own server. Account uniqueness is a
//! cluster-wide rule, so the *hub* checks every store before calling
//! [`PresenceStore::connect_account`]; the store itself simply overwrites.
//! Character uniqueness is enforced here, per server, and nowhere else.
//! The same character name may be connected on two different world
//! servers at once.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use shardhub_protocol::{AccountName, CharacterName, SessionId};

use crate::SessionError;

/// Accounts and characters connected to a single world server.
#[derive(Debug, Default)]
pub struct PresenceStore {
    /// Normalized account name → the session that holds it.
    accounts: HashMap<AccountName, SessionId>,

    /// Character name → owning account.
    characters: HashMap<CharacterName, AccountName>,
}

impl PresenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a live session for `account`.
    ///
    /// Inserts or overwrites; returns the session it replaced, if any.
    /// Duplicate-login protection happens one level up.
    pub fn connect_account(
        &mut self,
        account: AccountName,
        session_id: SessionId,
    ) -> Option<SessionId> {
        self.accounts.insert(account, session_id)
    }

    /// Records `character` as in-world, owned by `account`.
    ///
    /// # Errors
    /// Returns [`SessionError::CharacterAlreadyConnected`] if the
    /// character is already connected on this server. The existing
    /// mapping is left untouched.
    pub fn connect_character(
        &mut self,
        character: CharacterName,
        account: AccountName,
    ) -> Result<(), SessionError> {
        match self.characters.entry(character) {
            Entry::Occupied(slot) => Err(
                SessionError::CharacterAlreadyConnected(slot.key().clone()),
            ),
            Entry::Vacant(slot) => {
                slot.insert(account);
                Ok(())
            }
        }
    }

    /// Removes the account's session. Returns the removed session id, or
    /// `None` if the account wasn't connected here.
    pub fn disconnect_account(
        &mut self,
        account: &AccountName,
    ) -> Option<SessionId> {
        self.accounts.remove(account)
    }

    /// Removes the character. Returns its owning account, or `None` if
    /// the character wasn't connected here.
    pub fn disconnect_character(
        &mut self,
        character: &CharacterName,
    ) -> Option<AccountName> {
        self.characters.remove(character)
    }

    /// Returns `true` if the account has a session on this server.
    pub fn has_account(&self, account: &AccountName) -> bool {
        self.accounts.contains_key(account)
    }

    /// Returns `true` if the character is connected on this server.
    pub fn has_character(&self, character: &CharacterName) -> bool {
        self.characters.contains_key(character)
    }

    /// The session currently held by `account` on this server.
    pub fn session_of(&self, account: &AccountName) -> Option<SessionId> {
        self.accounts.get(account).copied()
    }

    /// Reverse lookup: which account holds `session_id` here.
    ///
    /// Linear in the number of connected accounts. Only kicks by bare
    /// session id need it.
    pub fn account_with_session(
        &self,
        session_id: SessionId,
    ) -> Option<&AccountName> {
        self.accounts
            .iter()
            .find(|(_, sid)| **sid == session_id)
            .map(|(account, _)| account)
    }

    /// The account that owns `character` on this server.
    pub fn owner_of(&self, character: &CharacterName) -> Option<&AccountName> {
        self.characters.get(character)
    }

    /// Number of connected accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of connected characters.
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Returns `true` if nothing is connected here.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.characters.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `PresenceStore`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use super::*;

    fn acc(name: &str) -> AccountName {
        AccountName::new(name)
    }

    fn chr(name: &str) -> CharacterName {
        CharacterName::new(name)
    }

    // =====================================================================
    // accounts
    // =====================================================================

    #[test]
    fn test_connect_account_new_account_is_present() {
        let mut store = PresenceStore::new();

        let replaced = store.connect_account(acc("bob"), SessionId(1));

        assert!(replaced.is_none());
        assert!(store.has_account(&acc("bob")));
        assert_eq!(store.session_of(&acc("bob")), Some(SessionId(1)));
    }

    #[test]
    fn test_connect_account_lookup_is_case_insensitive() {
        let mut store = PresenceStore::new();
        store.connect_account(acc("Bob"), SessionId(1));

        assert!(store.has_account(&acc("BOB")));
    }

    #[test]
    fn test_connect_account_existing_account_overwrites_session() {
        let mut store = PresenceStore::new();
        store.connect_account(acc("bob"), SessionId(1));

        let replaced = store.connect_account(acc("bob"), SessionId(2));

        assert_eq!(replaced, Some(SessionId(1)));
        assert_eq!(store.session_of(&acc("bob")), Some(SessionId(2)));
        assert_eq!(store.account_count(), 1);
    }

    #[test]
    fn test_disconnect_account_returns_removed_session() {
        let mut store = PresenceStore::new();
        store.connect_account(acc("bob"), SessionId(9));

        assert_eq!(store.disconnect_account(&acc("bob")), Some(SessionId(9)));
        assert!(!store.has_account(&acc("bob")));
    }

    #[test]
    fn test_disconnect_account_unknown_returns_none() {
        let mut store = PresenceStore::new();

        assert!(store.disconnect_account(&acc("ghost")).is_none());
    }

    #[test]
    fn test_account_with_session_finds_owner() {
        let mut store = PresenceStore::new();
        store.connect_account(acc("alice"), SessionId(1));
        store.connect_account(acc("bob"), SessionId(2));

        assert_eq!(store.account_with_session(SessionId(2)), Some(&acc("bob")));
        assert!(store.account_with_session(SessionId(3)).is_none());
    }

    // =====================================================================
    // characters
    // =====================================================================

    #[test]
    fn test_connect_character_new_character_succeeds() {
        let mut store = PresenceStore::new();

        store
            .connect_character(chr("Hero"), acc("bob"))
            .expect("should succeed");

        assert!(store.has_character(&chr("Hero")));
        assert_eq!(store.owner_of(&chr("Hero")), Some(&acc("bob")));
    }

    #[test]
    fn test_connect_character_duplicate_returns_error() {
        let mut store = PresenceStore::new();
        store.connect_character(chr("Hero"), acc("bob")).unwrap();

        let result = store.connect_character(chr("Hero"), acc("mallory"));

        assert!(matches!(
            result,
            Err(SessionError::CharacterAlreadyConnected(c)) if c == chr("Hero")
        ));
        // The original owner is kept.
        assert_eq!(store.owner_of(&chr("Hero")), Some(&acc("bob")));
    }

    #[test]
    fn test_connect_character_names_are_case_sensitive() {
        let mut store = PresenceStore::new();
        store.connect_character(chr("Hero"), acc("bob")).unwrap();

        store
            .connect_character(chr("hero"), acc("carol"))
            .expect("different case is a different character");
        assert_eq!(store.character_count(), 2);
    }

    #[test]
    fn test_disconnect_character_returns_owner() {
        let mut store = PresenceStore::new();
        store.connect_character(chr("Hero"), acc("bob")).unwrap();

        assert_eq!(store.disconnect_character(&chr("Hero")), Some(acc("bob")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_is_empty_tracks_both_maps() {
        let mut store = PresenceStore::new();
        assert!(store.is_empty());

        store.connect_character(chr("Hero"), acc("bob")).unwrap();
        assert!(!store.is_empty());

        store.disconnect_character(&chr("Hero"));
        store.connect_account(acc("bob"), SessionId(1));
        assert!(!store.is_empty());
    }
}
