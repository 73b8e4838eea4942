//! The coordination hub: cluster-wide operations over the shard registry,
//! presence stores, and login tickets.
//!
//! `Hub` is plain synchronous state. Every operation takes `&mut self` and
//! completes without I/O, so whoever owns the `Hub` serializes access to
//! it simply by owning it. In the server that owner is the actor in
//! [`actor`](crate::actor); tests drive a `Hub` directly.
//!
//! Operations return `Result`s that distinguish invalid input, not-found,
//! and conflict. Collapsing those into the wire's `false`/`null` is done at
//! the connection boundary, which also decides how loudly to log them.

use std::collections::HashMap;

use shardhub_protocol::{
    AccountName, ChannelList, CharacterId, CharacterName, Endpoint,
    PresenceEvent, SessionId, WorldId, WorldServerInfo,
};
use shardhub_registry::{
    Registration, RegistryError, ShardRegistry, WorldServer,
};
use shardhub_session::{LoginTickets, SessionError};
use shardhub_transport::ConnectionId;

use crate::broadcast::{Broadcaster, Subscription};
use crate::{HubConfig, HubError};

/// A point-in-time summary of hub state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub groups: usize,
    pub worlds: usize,
    pub accounts: usize,
    pub characters: usize,
    pub pending_tickets: usize,
    pub subscribers: usize,
}

/// Registry, tickets, and presence fan-out in one place.
#[derive(Debug)]
pub struct Hub {
    registry: ShardRegistry,
    tickets: LoginTickets,
    broadcaster: Broadcaster,
    /// The connection that last registered each endpoint.
    owners: HashMap<Endpoint, ConnectionId>,
}

impl Hub {
    /// Creates an empty hub.
    pub fn new(config: &HubConfig) -> Self {
        Self {
            registry: ShardRegistry::new(),
            tickets: LoginTickets::new(),
            broadcaster: Broadcaster::new(config.subscriber_queue_size),
            owners: HashMap::new(),
        }
    }

    /// Read access to the shard registry.
    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------

    /// Adds a world server to `group`, creating the group if needed.
    pub fn register_worldserver(
        &mut self,
        group: &str,
        server: WorldServerInfo,
    ) -> Result<Registration, HubError> {
        if group.trim().is_empty() {
            return Err(HubError::Invalid("group name is empty".into()));
        }
        if server.endpoint.host.is_empty() {
            return Err(HubError::Invalid("endpoint host is empty".into()));
        }
        Ok(self.registry.register(group, server)?)
    }

    /// Removes the world server at `endpoint`.
    ///
    /// Whoever was connected to it is dropped with it. No disconnect
    /// events are published for them; the world server is gone and so are
    /// its sessions.
    pub fn unregister_worldserver(
        &mut self,
        group: &str,
        endpoint: &Endpoint,
    ) -> Result<WorldServer, HubError> {
        let world = self.registry.unregister(group, endpoint)?;
        self.owners.remove(world.endpoint());
        let presence = world.presence();
        if !presence.is_empty() {
            tracing::info!(
                world_id = %world.id(),
                accounts = presence.account_count(),
                characters = presence.character_count(),
                "presence dropped with world server"
            );
        }
        Ok(world)
    }

    /// Registers `server` on behalf of connection `owner`.
    ///
    /// The last connection to register an endpoint owns it. A world server
    /// that reconnects before its old socket is noticed as dead takes the
    /// endpoint over, and the old connection can no longer release it.
    pub fn claim_worldserver(
        &mut self,
        group: &str,
        server: WorldServerInfo,
        owner: ConnectionId,
    ) -> Result<Registration, HubError> {
        let endpoint = server.endpoint.clone();
        let registration = self.register_worldserver(group, server)?;
        if let Some(previous) = self.owners.insert(endpoint.clone(), owner) {
            if previous != owner {
                tracing::info!(
                    world_id = %registration.world_id(),
                    %endpoint,
                    %previous,
                    %owner,
                    "world server moved to a new connection"
                );
            }
        }
        Ok(registration)
    }

    /// Unregisters the world server at `endpoint` if `owner` still owns
    /// it. Returns `None`, and changes nothing, when it doesn't.
    pub fn release_worldserver(
        &mut self,
        group: &str,
        endpoint: &Endpoint,
        owner: ConnectionId,
    ) -> Result<Option<WorldServer>, HubError> {
        if self.owners.get(endpoint) != Some(&owner) {
            tracing::debug!(%endpoint, %owner, "endpoint not owned, kept");
            return Ok(None);
        }
        self.unregister_worldserver(group, endpoint).map(Some)
    }

    /// Builds the channel list, or `None` if no groups are registered.
    pub fn retrieve_registered_worldservers(
        &self,
        session_id: SessionId,
    ) -> Option<ChannelList> {
        self.registry.channel_list(session_id)
    }

    // -----------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------

    /// Records `account` as connected on `world_id`.
    ///
    /// # Errors
    /// - [`SessionError::AccountAlreadyConnected`] if the account holds a
    ///   session on *any* world server.
    /// - [`RegistryError::WorldNotFound`] for an unknown world id.
    pub fn connect_account(
        &mut self,
        world_id: WorldId,
        account: AccountName,
        session_id: SessionId,
    ) -> Result<(), HubError> {
        require_account(&account)?;

        if let Some(holder) = self.registry.locate_account(&account) {
            tracing::debug!(
                %account,
                %holder,
                "account already holds a session"
            );
            return Err(SessionError::AccountAlreadyConnected(account).into());
        }

        let world = self
            .registry
            .world_mut(&world_id)
            .ok_or(RegistryError::WorldNotFound(world_id))?;
        world
            .presence_mut()
            .connect_account(account.clone(), session_id);

        tracing::info!(%world_id, %account, %session_id, "account connected");
        self.broadcaster.publish(PresenceEvent::AccountConnected {
            account,
            session_id,
        });
        Ok(())
    }

    /// Records `character` as in-world on `world_id`, owned by `account`.
    ///
    /// # Errors
    /// - [`SessionError::CharacterAlreadyConnected`] if the character is
    ///   already connected on *this* world server.
    /// - [`RegistryError::WorldNotFound`] for an unknown world id.
    pub fn connect_character(
        &mut self,
        world_id: WorldId,
        character: CharacterName,
        account: AccountName,
    ) -> Result<(), HubError> {
        if character.as_str().is_empty() {
            return Err(HubError::Invalid("character name is empty".into()));
        }

        let world = self
            .registry
            .world_mut(&world_id)
            .ok_or(RegistryError::WorldNotFound(world_id))?;
        let presence = world.presence_mut();
        if let Err(e) =
            presence.connect_character(character.clone(), account.clone())
        {
            tracing::debug!(
                %world_id,
                %character,
                requested_by = %account,
                owner = ?presence.owner_of(&character),
                "character already in world"
            );
            return Err(e.into());
        }

        tracing::info!(%world_id, %character, %account, "character connected");
        self.broadcaster
            .publish(PresenceEvent::CharacterConnected { character });
        Ok(())
    }

    /// Removes `account`'s session wherever it is. Returns the world
    /// server it was on.
    pub fn disconnect_account(
        &mut self,
        account: &AccountName,
    ) -> Result<WorldId, HubError> {
        require_account(account)?;

        let not_connected =
            || SessionError::AccountNotConnected(account.clone());
        let world_id =
            self.registry.locate_account(account).ok_or_else(not_connected)?;
        let session_id = self
            .registry
            .world_mut(&world_id)
            .and_then(|w| w.presence_mut().disconnect_account(account))
            .ok_or_else(not_connected)?;

        tracing::info!(%world_id, %account, %session_id, "account disconnected");
        self.broadcaster.publish(PresenceEvent::AccountDisconnected {
            account: account.clone(),
        });
        Ok(world_id)
    }

    /// Removes `character` from the first world server holding it, in
    /// channel order.
    pub fn disconnect_character(
        &mut self,
        character: &CharacterName,
        character_id: CharacterId,
    ) -> Result<WorldId, HubError> {
        let not_connected =
            || SessionError::CharacterNotConnected(character.clone());
        let world_id = self
            .registry
            .locate_character(character)
            .ok_or_else(not_connected)?;
        let owner = self
            .registry
            .world_mut(&world_id)
            .and_then(|w| w.presence_mut().disconnect_character(character))
            .ok_or_else(not_connected)?;

        tracing::info!(
            %world_id,
            %character,
            %character_id,
            account = %owner,
            "character disconnected"
        );
        self.broadcaster.publish(PresenceEvent::CharacterDisconnected {
            character: character.clone(),
            character_id,
        });
        Ok(world_id)
    }

    /// Returns `true` if `account` holds a session anywhere.
    pub fn account_is_connected(&self, account: &AccountName) -> bool {
        !account.is_empty() && self.registry.locate_account(account).is_some()
    }

    // -----------------------------------------------------------------
    // Login tickets
    // -----------------------------------------------------------------

    /// Writes a login ticket, replacing any pending one. Returns the
    /// session of the replaced ticket.
    pub fn register_account_login(
        &mut self,
        account: AccountName,
        session_id: SessionId,
    ) -> Result<Option<SessionId>, HubError> {
        require_account(&account)?;
        tracing::debug!(%account, %session_id, "login ticket registered");
        Ok(self.tickets.register(account, session_id))
    }

    /// Redeems the login ticket for `account`.
    ///
    /// `presented` is only logged; any redemption consumes the ticket.
    pub fn has_registered_account_login(
        &mut self,
        account: &AccountName,
        presented: SessionId,
    ) -> Result<SessionId, HubError> {
        require_account(account)?;
        let registered = self.tickets.redeem(account)?;
        if registered != presented {
            tracing::info!(
                %account,
                %registered,
                %presented,
                "login ticket redeemed with a different session id"
            );
        } else {
            tracing::debug!(%account, session_id = %registered, "login ticket redeemed");
        }
        Ok(registered)
    }

    /// Drops every pending login ticket. Returns how many were dropped.
    pub fn cleanup(&mut self) -> usize {
        let dropped = self.tickets.clear();
        tracing::info!(dropped, "login tickets cleared");
        dropped
    }

    // -----------------------------------------------------------------
    // Kicks and fan-out
    // -----------------------------------------------------------------

    /// Forces a session off the cluster.
    ///
    /// The kick event goes out before any local state is touched, so the
    /// socket owner hears about it even when the hub has no record of the
    /// session. With only a session id, the account is found by scanning
    /// every world server. Returns the account that was disconnected
    /// locally, if any.
    ///
    /// # Errors
    /// [`HubError::Invalid`] when neither a session id nor a non-empty
    /// account name is given. Nothing is published in that case.
    pub fn kick_session(
        &mut self,
        session_id: Option<SessionId>,
        account: Option<AccountName>,
    ) -> Result<Option<AccountName>, HubError> {
        let account = account.filter(|a| !a.is_empty());
        if session_id.is_none() && account.is_none() {
            return Err(HubError::Invalid(
                "kick needs a session id or an account name".into(),
            ));
        }

        self.broadcaster.publish(PresenceEvent::KickSession {
            session_id,
            account: account.clone(),
        });

        let target = account.or_else(|| {
            session_id
                .and_then(|sid| self.registry.locate_session(sid))
                .map(|(_, account)| account)
        });
        let Some(target) = target else {
            tracing::info!(
                session_id = ?session_id,
                "kick published, no local session to drop"
            );
            return Ok(None);
        };

        match self.disconnect_account(&target) {
            Ok(_) => Ok(Some(target)),
            Err(HubError::Session(SessionError::AccountNotConnected(_))) => {
                tracing::info!(
                    account = %target,
                    "kick published, account not connected here"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Adds a presence-event subscriber.
    pub fn subscribe(&mut self) -> Subscription {
        self.broadcaster.subscribe()
    }

    /// Current counts.
    pub fn stats(&self) -> HubStats {
        HubStats {
            groups: self.registry.group_count(),
            worlds: self.registry.world_count(),
            accounts: self.registry.account_count(),
            characters: self.registry.character_count(),
            pending_tickets: self.tickets.len(),
            subscribers: self.broadcaster.subscriber_count(),
        }
    }
}

fn require_account(account: &AccountName) -> Result<(), HubError> {
    if account.is_empty() {
        return Err(HubError::Invalid("account name is empty".into()));
    }
    Ok(())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use super::*;
    use crate::ErrorKind;

    fn hub() -> Hub {
        Hub::new(&HubConfig::default())
    }

    fn acc(name: &str) -> AccountName {
        AccountName::new(name)
    }

    fn chr(name: &str) -> CharacterName {
        CharacterName::new(name)
    }

    fn server(id: u64, port: u16) -> WorldServerInfo {
        WorldServerInfo {
            id: WorldId(id),
            endpoint: Endpoint::new("127.0.0.1", port),
            account_limit: 100,
        }
    }

    /// A hub with one group "Act1" holding worlds 1 and 2.
    fn hub_with_two_worlds() -> Hub {
        let mut hub = hub();
        hub.register_worldserver("Act1", server(1, 4000)).unwrap();
        hub.register_worldserver("Act1", server(2, 4001)).unwrap();
        hub
    }

    fn drain(sub: &mut Subscription) -> Vec<PresenceEvent> {
        std::iter::from_fn(|| sub.try_recv()).collect()
    }

    // =====================================================================
    // membership
    // =====================================================================

    #[test]
    fn test_register_worldserver_same_server_twice_keeps_member_count() {
        let mut hub = hub();
        hub.register_worldserver("Act1", server(1, 4000)).unwrap();

        let again = hub.register_worldserver("Act1", server(1, 4000)).unwrap();

        assert_eq!(again, Registration::AlreadyRegistered(WorldId(1)));
        assert_eq!(hub.registry().group("Act1").unwrap().len(), 1);
    }

    #[test]
    fn test_register_worldserver_empty_group_returns_invalid() {
        let mut hub = hub();
        let err = hub.register_worldserver("  ", server(1, 4000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(hub.stats().worlds, 0);
    }

    #[test]
    fn test_unregister_worldserver_last_member_removes_group_from_list() {
        let mut hub = hub();
        hub.register_worldserver("Act1", server(1, 4000)).unwrap();
        hub.register_worldserver("Act2", server(2, 5000)).unwrap();

        hub.unregister_worldserver("Act1", &Endpoint::new("127.0.0.1", 4000))
            .unwrap();

        let list = hub
            .retrieve_registered_worldservers(SessionId(7))
            .unwrap()
            .to_string();
        assert_eq!(list, "NsTeST 7 127.0.0.1:5000:1:1.1.Act2 ");
    }

    #[test]
    fn test_unregister_worldserver_twice_second_is_not_found() {
        let mut hub = hub();
        hub.register_worldserver("Act1", server(1, 4000)).unwrap();
        let endpoint = Endpoint::new("127.0.0.1", 4000);

        hub.unregister_worldserver("Act1", &endpoint).unwrap();
        let err = hub.unregister_worldserver("Act1", &endpoint).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_unregister_worldserver_drops_its_presence() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();

        hub.unregister_worldserver("Act1", &Endpoint::new("127.0.0.1", 4000))
            .unwrap();

        assert!(!hub.account_is_connected(&acc("bob")));
        // bob may log in again elsewhere.
        hub.connect_account(WorldId(2), acc("bob"), SessionId(2)).unwrap();
    }

    #[test]
    fn test_release_worldserver_after_takeover_keeps_world() {
        let mut hub = hub();
        let endpoint = Endpoint::new("127.0.0.1", 4000);
        let old = ConnectionId::new(1);
        let new = ConnectionId::new(2);
        hub.claim_worldserver("Act1", server(1, 4000), old).unwrap();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();

        let again = hub.claim_worldserver("Act1", server(1, 4000), new).unwrap();
        let released = hub.release_worldserver("Act1", &endpoint, old).unwrap();

        assert_eq!(again, Registration::AlreadyRegistered(WorldId(1)));
        assert!(released.is_none());
        assert_eq!(hub.stats().worlds, 1);
        assert!(hub.account_is_connected(&acc("bob")));
    }

    #[test]
    fn test_release_worldserver_by_owner_unregisters() {
        let mut hub = hub();
        let endpoint = Endpoint::new("127.0.0.1", 4000);
        let owner = ConnectionId::new(1);
        hub.claim_worldserver("Act1", server(1, 4000), owner).unwrap();

        let released = hub.release_worldserver("Act1", &endpoint, owner).unwrap();

        assert_eq!(released.map(|w| w.id()), Some(WorldId(1)));
        assert_eq!(hub.stats().groups, 0);
    }

    #[test]
    fn test_release_worldserver_after_explicit_unregister_is_noop() {
        let mut hub = hub();
        let endpoint = Endpoint::new("127.0.0.1", 4000);
        let owner = ConnectionId::new(1);
        hub.claim_worldserver("Act1", server(1, 4000), owner).unwrap();
        hub.unregister_worldserver("Act1", &endpoint).unwrap();
        // Re-registered without an owner, e.g. through the handle.
        hub.register_worldserver("Act1", server(1, 4000)).unwrap();

        let released = hub.release_worldserver("Act1", &endpoint, owner).unwrap();

        assert!(released.is_none());
        assert_eq!(hub.stats().worlds, 1);
    }

    #[test]
    fn test_claim_worldserver_conflict_takes_no_ownership() {
        let mut hub = hub();
        let endpoint = Endpoint::new("127.0.0.1", 4000);
        hub.claim_worldserver("Act1", server(1, 4000), ConnectionId::new(1))
            .unwrap();

        let err = hub
            .claim_worldserver("Act2", server(1, 4000), ConnectionId::new(2))
            .unwrap_err();
        let released = hub
            .release_worldserver("Act2", &endpoint, ConnectionId::new(2))
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(released.is_none());
        assert_eq!(hub.stats().worlds, 1);
    }

    #[test]
    fn test_retrieve_registered_worldservers_exact_format() {
        let mut hub = hub();
        hub.register_worldserver("Act1", server(1, 4000)).unwrap();

        let list = hub.retrieve_registered_worldservers(SessionId(42)).unwrap();

        assert_eq!(list.to_string(), "NsTeST 42 127.0.0.1:4000:1:1.1.Act1 ");
    }

    #[test]
    fn test_retrieve_registered_worldservers_no_groups_returns_none() {
        let hub = hub();
        assert!(hub.retrieve_registered_worldservers(SessionId(1)).is_none());
    }

    // =====================================================================
    // accounts
    // =====================================================================

    #[test]
    fn test_connect_account_then_is_connected() {
        let mut hub = hub_with_two_worlds();

        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();

        assert!(hub.account_is_connected(&acc("bob")));
        assert!(hub.account_is_connected(&acc("BOB")));
    }

    #[test]
    fn test_connect_account_second_world_returns_conflict() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();

        let same_world =
            hub.connect_account(WorldId(1), acc("bob"), SessionId(2));
        let other_world =
            hub.connect_account(WorldId(2), acc("Bob"), SessionId(3));

        assert_eq!(same_world.unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(other_world.unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(hub.stats().accounts, 1);
    }

    #[test]
    fn test_connect_account_after_disconnect_succeeds() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();
        hub.disconnect_account(&acc("bob")).unwrap();

        hub.connect_account(WorldId(2), acc("bob"), SessionId(2)).unwrap();

        let world = hub.registry().world(&WorldId(2)).unwrap();
        assert_eq!(world.presence().session_of(&acc("bob")), Some(SessionId(2)));
    }

    #[test]
    fn test_connect_account_unknown_world_returns_not_found() {
        let mut hub = hub_with_two_worlds();

        let err = hub
            .connect_account(WorldId(99), acc("bob"), SessionId(1))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!hub.account_is_connected(&acc("bob")));
    }

    #[test]
    fn test_connect_account_empty_name_returns_invalid() {
        let mut hub = hub_with_two_worlds();
        let err = hub
            .connect_account(WorldId(1), acc(""), SessionId(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_disconnect_account_not_connected_is_not_found() {
        let mut hub = hub_with_two_worlds();
        let mut sub = hub.subscribe();

        let err = hub.disconnect_account(&acc("ghost")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(drain(&mut sub).is_empty());
    }

    #[test]
    fn test_account_is_connected_empty_name_is_false() {
        let hub = hub_with_two_worlds();
        assert!(!hub.account_is_connected(&acc("")));
    }

    // =====================================================================
    // characters
    // =====================================================================

    #[test]
    fn test_connect_character_twice_same_world_returns_conflict() {
        let mut hub = hub_with_two_worlds();
        hub.connect_character(WorldId(1), chr("Hero"), acc("bob")).unwrap();

        let err = hub
            .connect_character(WorldId(1), chr("Hero"), acc("bob"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_connect_character_other_world_is_permitted() {
        // Character uniqueness is scoped to one world server.
        let mut hub = hub_with_two_worlds();
        hub.connect_character(WorldId(1), chr("Hero"), acc("bob")).unwrap();

        hub.connect_character(WorldId(2), chr("Hero"), acc("bob")).unwrap();

        assert_eq!(hub.stats().characters, 2);
    }

    #[test]
    fn test_disconnect_character_removes_first_in_channel_order() {
        let mut hub = hub_with_two_worlds();
        hub.connect_character(WorldId(2), chr("Hero"), acc("bob")).unwrap();
        hub.connect_character(WorldId(1), chr("Hero"), acc("bob")).unwrap();

        let from = hub.disconnect_character(&chr("Hero"), CharacterId(5)).unwrap();
        assert_eq!(from, WorldId(1));

        let from = hub.disconnect_character(&chr("Hero"), CharacterId(5)).unwrap();
        assert_eq!(from, WorldId(2));

        let err = hub
            .disconnect_character(&chr("Hero"), CharacterId(5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // =====================================================================
    // tickets
    // =====================================================================

    #[test]
    fn test_has_registered_account_login_redeems_exactly_once() {
        let mut hub = hub();
        hub.register_account_login(acc("bob"), SessionId(1)).unwrap();

        assert!(hub.has_registered_account_login(&acc("bob"), SessionId(1)).is_ok());
        let err = hub
            .has_registered_account_login(&acc("bob"), SessionId(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_has_registered_account_login_ignores_presented_session() {
        let mut hub = hub();
        hub.register_account_login(acc("bob"), SessionId(1)).unwrap();

        let registered = hub
            .has_registered_account_login(&acc("BOB"), SessionId(999))
            .unwrap();

        assert_eq!(registered, SessionId(1));
        assert_eq!(hub.stats().pending_tickets, 0);
    }

    #[test]
    fn test_register_account_login_latest_wins() {
        let mut hub = hub();
        hub.register_account_login(acc("bob"), SessionId(1)).unwrap();

        let replaced = hub.register_account_login(acc("bob"), SessionId(2)).unwrap();

        assert_eq!(replaced, Some(SessionId(1)));
        assert_eq!(
            hub.has_registered_account_login(&acc("bob"), SessionId(2)).unwrap(),
            SessionId(2)
        );
    }

    #[test]
    fn test_cleanup_clears_tickets_only() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();
        hub.register_account_login(acc("alice"), SessionId(2)).unwrap();
        hub.register_account_login(acc("carol"), SessionId(3)).unwrap();

        assert_eq!(hub.cleanup(), 2);

        let stats = hub.stats();
        assert_eq!(stats.pending_tickets, 0);
        assert_eq!(stats.accounts, 1);
        assert_eq!(stats.worlds, 2);
    }

    // =====================================================================
    // events and kicks
    // =====================================================================

    #[test]
    fn test_connect_and_disconnect_publish_events() {
        let mut hub = hub_with_two_worlds();
        let mut sub = hub.subscribe();

        hub.connect_account(WorldId(1), acc("Bob"), SessionId(1)).unwrap();
        hub.connect_character(WorldId(1), chr("Hero"), acc("bob")).unwrap();
        hub.disconnect_character(&chr("Hero"), CharacterId(3)).unwrap();
        hub.disconnect_account(&acc("bob")).unwrap();

        assert_eq!(
            drain(&mut sub),
            vec![
                PresenceEvent::AccountConnected {
                    account: acc("bob"),
                    session_id: SessionId(1),
                },
                PresenceEvent::CharacterConnected { character: chr("Hero") },
                PresenceEvent::CharacterDisconnected {
                    character: chr("Hero"),
                    character_id: CharacterId(3),
                },
                PresenceEvent::AccountDisconnected { account: acc("bob") },
            ]
        );
    }

    #[test]
    fn test_connect_account_conflict_publishes_nothing() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();
        let mut sub = hub.subscribe();

        let _ = hub.connect_account(WorldId(2), acc("bob"), SessionId(2));

        assert!(drain(&mut sub).is_empty());
    }

    #[test]
    fn test_kick_session_both_empty_is_invalid_and_silent() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("bob"), SessionId(1)).unwrap();
        let mut sub = hub.subscribe();
        let before = hub.stats();

        let err = hub.kick_session(None, Some(acc(""))).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(drain(&mut sub).is_empty());
        assert_eq!(hub.stats(), before);
    }

    #[test]
    fn test_kick_session_by_account_publishes_kick_then_disconnect() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(2), acc("bob"), SessionId(8)).unwrap();
        let mut sub = hub.subscribe();

        let kicked = hub.kick_session(None, Some(acc("bob"))).unwrap();

        assert_eq!(kicked, Some(acc("bob")));
        assert!(!hub.account_is_connected(&acc("bob")));
        assert_eq!(
            drain(&mut sub),
            vec![
                PresenceEvent::KickSession {
                    session_id: None,
                    account: Some(acc("bob")),
                },
                PresenceEvent::AccountDisconnected { account: acc("bob") },
            ]
        );
    }

    #[test]
    fn test_kick_session_by_session_id_finds_account() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("alice"), SessionId(3)).unwrap();
        hub.connect_account(WorldId(2), acc("bob"), SessionId(8)).unwrap();

        let kicked = hub.kick_session(Some(SessionId(8)), None).unwrap();

        assert_eq!(kicked, Some(acc("bob")));
        assert!(hub.account_is_connected(&acc("alice")));
        assert!(!hub.account_is_connected(&acc("bob")));
    }

    #[test]
    fn test_kick_session_unknown_session_still_publishes() {
        let mut hub = hub_with_two_worlds();
        let mut sub = hub.subscribe();

        let kicked = hub.kick_session(Some(SessionId(404)), None).unwrap();

        assert!(kicked.is_none());
        assert_eq!(
            drain(&mut sub),
            vec![PresenceEvent::KickSession {
                session_id: Some(SessionId(404)),
                account: None,
            }]
        );
    }

    #[test]
    fn test_kick_session_account_takes_precedence_over_session() {
        let mut hub = hub_with_two_worlds();
        hub.connect_account(WorldId(1), acc("alice"), SessionId(3)).unwrap();
        hub.connect_account(WorldId(2), acc("bob"), SessionId(8)).unwrap();

        let kicked = hub
            .kick_session(Some(SessionId(3)), Some(acc("bob")))
            .unwrap();

        assert_eq!(kicked, Some(acc("bob")));
        assert!(hub.account_is_connected(&acc("alice")));
    }

    #[test]
    fn test_stats_counts_subscribers() {
        let mut hub = hub();
        let _a = hub.subscribe();
        let _b = hub.subscribe();
        assert_eq!(hub.stats().subscribers, 2);
    }
}
