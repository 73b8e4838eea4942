//! The shard registry: every world server and the group it belongs to.
//!
//! Two views of the same membership are kept:
//! - a flat map from [`WorldId`] to [`WorldServer`], for direct lookups
//! - an ordered list of [`ShardGroup`]s, for channel numbering
//!
//! Every mutation updates both in the same `&mut self` call, so no caller
//! can observe a server in one view but not the other, or a group with no
//! members.

use std::collections::HashMap;

use shardhub_protocol::{
    AccountName, ChannelEntry, ChannelList, CharacterName, DEFAULT_CHANNEL_COLOR,
    Endpoint, SessionId, WorldId, WorldServerInfo,
};

use crate::{RegistryError, ShardGroup, WorldServer};

/// What [`ShardRegistry::register`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The group didn't exist; it was created with this server as its
    /// only member.
    CreatedGroup(WorldId),

    /// The server was appended to an existing group.
    Joined(WorldId),

    /// A server with the same endpoint was already in the group. Nothing
    /// changed; the id is the one already on record.
    AlreadyRegistered(WorldId),
}

impl Registration {
    /// The id of the server now on record for the endpoint.
    pub fn world_id(&self) -> WorldId {
        match self {
            Self::CreatedGroup(id)
            | Self::Joined(id)
            | Self::AlreadyRegistered(id) => *id,
        }
    }
}

/// Authoritative membership of the cluster.
#[derive(Debug, Default)]
pub struct ShardRegistry {
    /// Every registered world server.
    worlds: HashMap<WorldId, WorldServer>,

    /// Groups in creation order. A `Vec` rather than a map because the
    /// order is part of the channel-list contract.
    groups: Vec<ShardGroup>,
}

impl ShardRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a world server under `group`.
    ///
    /// Servers are matched by endpoint. Registering an endpoint that is
    /// already in `group` is a no-op.
    ///
    /// # Errors
    /// - [`RegistryError::EndpointInUse`]: the endpoint is a member of a
    ///   different group. A server belongs to at most one group.
    /// - [`RegistryError::WorldIdInUse`]: a different endpoint already
    ///   registered with this id.
    pub fn register(
        &mut self,
        group: &str,
        info: WorldServerInfo,
    ) -> Result<Registration, RegistryError> {
        if let Some(existing) = self.find_by_endpoint(&info.endpoint) {
            let world = &self.worlds[&existing];
            if world.group() == group {
                tracing::info!(
                    group,
                    endpoint = %info.endpoint,
                    world_id = %existing,
                    "world server already registered"
                );
                return Ok(Registration::AlreadyRegistered(existing));
            }
            return Err(RegistryError::EndpointInUse {
                endpoint: info.endpoint,
                group: world.group().to_string(),
            });
        }

        if self.worlds.contains_key(&info.id) {
            return Err(RegistryError::WorldIdInUse(info.id));
        }

        let id = info.id;
        let endpoint = info.endpoint.clone();
        self.worlds.insert(id, WorldServer::new(info, group));

        let registration = match self.group_mut(group) {
            Some(existing) => {
                existing.push(id);
                Registration::Joined(id)
            }
            None => {
                self.groups.push(ShardGroup::new(group, id));
                Registration::CreatedGroup(id)
            }
        };

        tracing::info!(
            group,
            %endpoint,
            world_id = %id,
            "world server registered"
        );
        Ok(registration)
    }

    /// Removes the world server at `endpoint` and returns it.
    ///
    /// `group` is where the caller believes the server lives. If it isn't
    /// there, every group is searched, since a server can end up
    /// registered under a different name than the one it unregisters with.
    /// A group left without members is deleted in the same call.
    ///
    /// # Errors
    /// Returns [`RegistryError::EndpointNotFound`] if no server has the
    /// endpoint. Callers treat this as "already unregistered".
    pub fn unregister(
        &mut self,
        group: &str,
        endpoint: &Endpoint,
    ) -> Result<WorldServer, RegistryError> {
        let id = self
            .find_in_group(group, endpoint)
            .or_else(|| self.find_by_endpoint(endpoint))
            .ok_or_else(|| RegistryError::EndpointNotFound(endpoint.clone()))?;

        let world = self
            .worlds
            .remove(&id)
            .ok_or(RegistryError::WorldNotFound(id))?;

        if let Some(index) =
            self.groups.iter().position(|g| g.name() == world.group())
        {
            self.groups[index].remove(&id);
            if self.groups[index].is_empty() {
                self.groups.remove(index);
                tracing::info!(group = world.group(), "shard group removed");
            }
        }

        tracing::info!(
            group = world.group(),
            %endpoint,
            world_id = %id,
            "world server unregistered"
        );
        Ok(world)
    }

    // -----------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------

    /// Looks up a world server by id.
    pub fn world(&self, id: &WorldId) -> Option<&WorldServer> {
        self.worlds.get(id)
    }

    /// Looks up a world server by id, mutably.
    pub fn world_mut(&mut self, id: &WorldId) -> Option<&mut WorldServer> {
        self.worlds.get_mut(id)
    }

    /// The id of the server registered at `endpoint`, in any group.
    pub fn find_by_endpoint(&self, endpoint: &Endpoint) -> Option<WorldId> {
        self.worlds
            .values()
            .find(|w| w.endpoint() == endpoint)
            .map(WorldServer::id)
    }

    /// The id of the server at `endpoint`, if it is a member of `group`.
    fn find_in_group(&self, group: &str, endpoint: &Endpoint) -> Option<WorldId> {
        self.group(group)?
            .members()
            .iter()
            .copied()
            .find(|id| {
                self.worlds
                    .get(id)
                    .is_some_and(|w| w.endpoint() == endpoint)
            })
    }

    /// Looks up a group by name.
    pub fn group(&self, name: &str) -> Option<&ShardGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut ShardGroup> {
        self.groups.iter_mut().find(|g| g.name() == name)
    }

    /// Groups in registry (creation) order.
    pub fn groups(&self) -> &[ShardGroup] {
        &self.groups
    }

    /// Every world server, group by group, in channel order.
    pub fn worlds_in_channel_order(
        &self,
    ) -> impl Iterator<Item = &WorldServer> {
        self.groups.iter().flat_map(move |group| {
            group
                .members()
                .iter()
                .filter_map(move |id| self.worlds.get(id))
        })
    }

    /// The world server holding a session for `account`, anywhere in the
    /// cluster.
    pub fn locate_account(&self, account: &AccountName) -> Option<WorldId> {
        self.worlds
            .values()
            .find(|w| w.presence().has_account(account))
            .map(WorldServer::id)
    }

    /// The first world server, in channel order, on which `character` is
    /// connected. Characters are only unique per server, so there may be
    /// others.
    pub fn locate_character(
        &self,
        character: &CharacterName,
    ) -> Option<WorldId> {
        self.worlds_in_channel_order()
            .find(|w| w.presence().has_character(character))
            .map(WorldServer::id)
    }

    /// Reverse lookup of a session id: the server and account holding it.
    pub fn locate_session(
        &self,
        session_id: SessionId,
    ) -> Option<(WorldId, AccountName)> {
        self.worlds_in_channel_order().find_map(|w| {
            w.presence()
                .account_with_session(session_id)
                .map(|account| (w.id(), account.clone()))
        })
    }

    // -----------------------------------------------------------------
    // Channel discovery
    // -----------------------------------------------------------------

    /// Builds the channel list for `session_id`, or `None` if no groups
    /// are registered.
    ///
    /// Groups are numbered 1..N in registry order and servers 1..M within
    /// their group. The numbers are recomputed on every call.
    pub fn channel_list(&self, session_id: SessionId) -> Option<ChannelList> {
        if self.groups.is_empty() {
            return None;
        }

        let mut entries = Vec::with_capacity(self.worlds.len());
        for (group_index, group) in self.groups.iter().enumerate() {
            for (channel_index, id) in group.members().iter().enumerate() {
                let Some(world) = self.worlds.get(id) else {
                    continue;
                };
                entries.push(ChannelEntry {
                    endpoint: world.endpoint().clone(),
                    // TODO: color channels by connected accounts against
                    // account_limit once clients render the color code.
                    color: DEFAULT_CHANNEL_COLOR,
                    group_index: group_index + 1,
                    channel_index: channel_index + 1,
                    group_name: group.name().to_string(),
                });
            }
        }

        Some(ChannelList {
            session_id,
            entries,
        })
    }

    // -----------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------

    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Connected accounts across every server.
    pub fn account_count(&self) -> usize {
        self.worlds.values().map(|w| w.presence().account_count()).sum()
    }

    /// Connected characters across every server.
    pub fn character_count(&self) -> usize {
        self.worlds
            .values()
            .map(|w| w.presence().character_count())
            .sum()
    }
}

// =========================================================================
// Tests
// =========================================================================
