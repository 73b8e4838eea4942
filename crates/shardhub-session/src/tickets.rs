//! One-time login tickets.
//!
//! The flow across processes:
//!
//! ```text
//! gateway:       register(account, session)   ── ticket written
//! world server:  redeem(account)              ── ticket consumed, socket admitted
//! world server:  redeem(account)  (again)     ── no ticket, socket refused
//! ```
//!
//! An account holds at most one ticket. A fresh login attempt overwrites
//! whatever was pending ("latest attempt wins").

use std::collections::HashMap;

use shardhub_protocol::{AccountName, SessionId};

use crate::SessionError;

/// Pending login tickets, keyed by normalized account name.
#[derive(Debug, Default)]
pub struct LoginTickets {
    pending: HashMap<AccountName, SessionId>,
}

impl LoginTickets {
    /// Creates an empty ticket registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the ticket for `account`, replacing any pending one.
    ///
    /// Returns the session id of the replaced ticket, if there was one.
    pub fn register(
        &mut self,
        account: AccountName,
        session_id: SessionId,
    ) -> Option<SessionId> {
        let replaced = self.pending.insert(account.clone(), session_id);
        if let Some(previous) = replaced {
            tracing::debug!(
                %account,
                %previous,
                %session_id,
                "pending login ticket replaced"
            );
        }
        replaced
    }

    /// Consumes the ticket for `account`.
    ///
    /// Check and removal are one `HashMap::remove`, so a ticket can be
    /// redeemed exactly once. The session id the ticket was registered
    /// with is returned; it is *not* compared against anything.
    ///
    /// # Errors
    /// Returns [`SessionError::NoPendingTicket`] if no ticket exists.
    pub fn redeem(
        &mut self,
        account: &AccountName,
    ) -> Result<SessionId, SessionError> {
        self.pending
            .remove(account)
            .ok_or_else(|| SessionError::NoPendingTicket(account.clone()))
    }

    /// Drops every pending ticket. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Number of pending tickets.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no tickets are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(name: &str) -> AccountName {
        AccountName::new(name)
    }

    #[test]
    fn test_redeem_registered_ticket_succeeds_once() {
        let mut tickets = LoginTickets::new();
        tickets.register(acc("bob"), SessionId(1));

        assert_eq!(tickets.redeem(&acc("bob")).unwrap(), SessionId(1));
        assert!(matches!(
            tickets.redeem(&acc("bob")),
            Err(SessionError::NoPendingTicket(a)) if a == acc("bob")
        ));
    }

    #[test]
    fn test_redeem_unknown_account_returns_error() {
        let mut tickets = LoginTickets::new();

        assert!(tickets.redeem(&acc("nobody")).is_err());
    }

    #[test]
    fn test_redeem_is_case_insensitive() {
        let mut tickets = LoginTickets::new();
        tickets.register(acc("Bob"), SessionId(1));

        assert!(tickets.redeem(&acc("BOB")).is_ok());
    }

    #[test]
    fn test_register_twice_latest_wins() {
        let mut tickets = LoginTickets::new();
        assert!(tickets.register(acc("bob"), SessionId(1)).is_none());

        let replaced = tickets.register(acc("bob"), SessionId(2));

        assert_eq!(replaced, Some(SessionId(1)));
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets.redeem(&acc("bob")).unwrap(), SessionId(2));
    }

    #[test]
    fn test_clear_drops_all_tickets() {
        let mut tickets = LoginTickets::new();
        tickets.register(acc("alice"), SessionId(1));
        tickets.register(acc("bob"), SessionId(2));

        assert_eq!(tickets.clear(), 2);
        assert!(tickets.is_empty());
        assert!(tickets.redeem(&acc("alice")).is_err());
    }
}
