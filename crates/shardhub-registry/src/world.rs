//! A registered world server.

use shardhub_protocol::{Endpoint, WorldId, WorldServerInfo};
use shardhub_session::PresenceStore;

/// One world server as the hub sees it: what it announced at registration,
/// the group it joined, and who is connected to it right now.
#[derive(Debug)]
pub struct WorldServer {
    info: WorldServerInfo,
    group: String,
    presence: PresenceStore,
}

impl WorldServer {
    pub(crate) fn new(info: WorldServerInfo, group: &str) -> Self {
        Self {
            info,
            group: group.to_string(),
            presence: PresenceStore::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.info.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.info.endpoint
    }

    pub fn account_limit(&self) -> u32 {
        self.info.account_limit
    }

    pub fn info(&self) -> &WorldServerInfo {
        &self.info
    }

    /// Name of the shard group this server belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn presence(&self) -> &PresenceStore {
        &self.presence
    }

    pub fn presence_mut(&mut self) -> &mut PresenceStore {
        &mut self.presence
    }
}
