//! Hub actor: a single Tokio task that owns the [`Hub`].
//!
//! Connection handlers never touch hub state directly. They send a
//! [`HubCommand`] through a [`HubHandle`] and wait on a oneshot reply
//! channel. Because one task applies commands one at a time, no two
//! operations ever interleave. Two world servers racing to log in the same
//! account are simply queued, and the second sees the first's result.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use shardhub_protocol::{
    AccountName, ChannelList, CharacterId, CharacterName, Endpoint, SessionId,
    WorldId, WorldServerInfo,
};
use shardhub_registry::Registration;
use shardhub_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::broadcast::Subscription;
use crate::hub::{Hub, HubStats};
use crate::{HubConfig, HubError};

type Reply<T> = oneshot::Sender<Result<T, HubError>>;

/// Commands sent to the hub actor.
///
/// One variant per hub operation. The `reply` sender is where the actor
/// puts the result.
pub(crate) enum HubCommand {
    RegisterWorldserver {
        group: String,
        server: WorldServerInfo,
        reply: Reply<Registration>,
    },
    UnregisterWorldserver {
        group: String,
        endpoint: Endpoint,
        reply: Reply<WorldId>,
    },
    ClaimWorldserver {
        group: String,
        server: WorldServerInfo,
        owner: ConnectionId,
        reply: Reply<Registration>,
    },
    ReleaseWorldserver {
        group: String,
        endpoint: Endpoint,
        owner: ConnectionId,
        reply: Reply<Option<WorldId>>,
    },
    ConnectAccount {
        world_id: WorldId,
        account: AccountName,
        session_id: SessionId,
        reply: Reply<()>,
    },
    ConnectCharacter {
        world_id: WorldId,
        character: CharacterName,
        account: AccountName,
        reply: Reply<()>,
    },
    DisconnectAccount {
        account: AccountName,
        reply: Reply<WorldId>,
    },
    DisconnectCharacter {
        character: CharacterName,
        character_id: CharacterId,
        reply: Reply<WorldId>,
    },
    AccountIsConnected {
        account: AccountName,
        reply: oneshot::Sender<bool>,
    },
    RegisterAccountLogin {
        account: AccountName,
        session_id: SessionId,
        reply: Reply<Option<SessionId>>,
    },
    HasRegisteredAccountLogin {
        account: AccountName,
        session_id: SessionId,
        reply: Reply<SessionId>,
    },
    KickSession {
        session_id: Option<SessionId>,
        account: Option<AccountName>,
        reply: Reply<Option<AccountName>>,
    },
    RetrieveRegisteredWorldservers {
        session_id: SessionId,
        reply: oneshot::Sender<Option<ChannelList>>,
    },
    Cleanup {
        reply: oneshot::Sender<usize>,
    },
    Subscribe {
        reply: oneshot::Sender<Subscription>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    /// Stop the actor. Commands already queued behind this are dropped.
    Shutdown,
}

impl HubCommand {
    /// The operation name, for logs.
    fn name(&self) -> &'static str {
        match self {
            Self::RegisterWorldserver { .. } => "RegisterWorldserver",
            Self::UnregisterWorldserver { .. } => "UnregisterWorldserver",
            Self::ClaimWorldserver { .. } => "ClaimWorldserver",
            Self::ReleaseWorldserver { .. } => "ReleaseWorldserver",
            Self::ConnectAccount { .. } => "ConnectAccount",
            Self::ConnectCharacter { .. } => "ConnectCharacter",
            Self::DisconnectAccount { .. } => "DisconnectAccount",
            Self::DisconnectCharacter { .. } => "DisconnectCharacter",
            Self::AccountIsConnected { .. } => "AccountIsConnected",
            Self::RegisterAccountLogin { .. } => "RegisterAccountLogin",
            Self::HasRegisteredAccountLogin { .. } => {
                "HasRegisteredAccountLogin"
            }
            Self::KickSession { .. } => "KickSession",
            Self::RetrieveRegisteredWorldservers { .. } => {
                "RetrieveRegisteredWorldservers"
            }
            Self::Cleanup { .. } => "Cleanup",
            Self::Subscribe { .. } => "Subscribe",
            Self::Stats { .. } => "Stats",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to the running hub actor.
///
/// Cheap to clone. Every connection handler holds one.
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
    timeout: Duration,
}

/// Spawns the hub actor on the current runtime and returns its handle.
pub fn spawn_hub(config: &HubConfig) -> HubHandle {
    let (sender, receiver) = mpsc::channel(config.command_queue_size.max(1));
    let actor = HubActor {
        hub: Hub::new(config),
        receiver,
    };
    tokio::spawn(actor.run());

    HubHandle {
        sender,
        timeout: config.request_timeout(),
    }
}

impl HubHandle {
    /// Sends a command built around a fresh reply channel and waits for
    /// the answer.
    ///
    /// Both the enqueue and the reply count against the request timeout.
    async fn request<T>(
        &self,
        op: &'static str,
        command: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let exchange = async {
            self.sender
                .send(command(reply_tx))
                .await
                .map_err(|_| HubError::Unavailable)?;
            // The actor drops the reply sender only when applying the
            // command panicked.
            reply_rx.await.map_err(|_| HubError::Fault(op))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| HubError::Timeout(self.timeout))?
    }

    pub async fn register_worldserver(
        &self,
        group: &str,
        server: WorldServerInfo,
    ) -> Result<Registration, HubError> {
        let group = group.to_string();
        self.request("RegisterWorldserver", |reply| {
            HubCommand::RegisterWorldserver {
                group,
                server,
                reply,
            }
        })
        .await?
    }

    pub async fn unregister_worldserver(
        &self,
        group: &str,
        endpoint: &Endpoint,
    ) -> Result<WorldId, HubError> {
        let group = group.to_string();
        let endpoint = endpoint.clone();
        self.request("UnregisterWorldserver", |reply| {
            HubCommand::UnregisterWorldserver {
                group,
                endpoint,
                reply,
            }
        })
        .await?
    }

    /// Registers `server` and makes connection `owner` its owner.
    pub async fn claim_worldserver(
        &self,
        group: &str,
        server: WorldServerInfo,
        owner: ConnectionId,
    ) -> Result<Registration, HubError> {
        let group = group.to_string();
        self.request("ClaimWorldserver", |reply| HubCommand::ClaimWorldserver {
            group,
            server,
            owner,
            reply,
        })
        .await?
    }

    /// Unregisters the world server at `endpoint` if `owner` still owns
    /// it. `Ok(None)` means another connection has taken it over.
    pub async fn release_worldserver(
        &self,
        group: &str,
        endpoint: &Endpoint,
        owner: ConnectionId,
    ) -> Result<Option<WorldId>, HubError> {
        let group = group.to_string();
        let endpoint = endpoint.clone();
        self.request("ReleaseWorldserver", |reply| {
            HubCommand::ReleaseWorldserver {
                group,
                endpoint,
                owner,
                reply,
            }
        })
        .await?
    }

    pub async fn connect_account(
        &self,
        world_id: WorldId,
        account: AccountName,
        session_id: SessionId,
    ) -> Result<(), HubError> {
        self.request("ConnectAccount", |reply| HubCommand::ConnectAccount {
            world_id,
            account,
            session_id,
            reply,
        })
        .await?
    }

    pub async fn connect_character(
        &self,
        world_id: WorldId,
        character: CharacterName,
        account: AccountName,
    ) -> Result<(), HubError> {
        self.request("ConnectCharacter", |reply| {
            HubCommand::ConnectCharacter {
                world_id,
                character,
                account,
                reply,
            }
        })
        .await?
    }

    pub async fn disconnect_account(
        &self,
        account: AccountName,
    ) -> Result<WorldId, HubError> {
        self.request("DisconnectAccount", |reply| {
            HubCommand::DisconnectAccount { account, reply }
        })
        .await?
    }

    pub async fn disconnect_character(
        &self,
        character: CharacterName,
        character_id: CharacterId,
    ) -> Result<WorldId, HubError> {
        self.request("DisconnectCharacter", |reply| {
            HubCommand::DisconnectCharacter {
                character,
                character_id,
                reply,
            }
        })
        .await?
    }

    /// Returns whether `account` is connected anywhere.
    ///
    /// The error cases are the actor's own failures (stopped, timed out,
    /// panicked). Callers on the wire treat them as `false`.
    pub async fn account_is_connected(
        &self,
        account: AccountName,
    ) -> Result<bool, HubError> {
        self.request("AccountIsConnected", |reply| {
            HubCommand::AccountIsConnected { account, reply }
        })
        .await
    }

    pub async fn register_account_login(
        &self,
        account: AccountName,
        session_id: SessionId,
    ) -> Result<Option<SessionId>, HubError> {
        self.request("RegisterAccountLogin", |reply| {
            HubCommand::RegisterAccountLogin {
                account,
                session_id,
                reply,
            }
        })
        .await?
    }

    pub async fn has_registered_account_login(
        &self,
        account: AccountName,
        session_id: SessionId,
    ) -> Result<SessionId, HubError> {
        self.request("HasRegisteredAccountLogin", |reply| {
            HubCommand::HasRegisteredAccountLogin {
                account,
                session_id,
                reply,
            }
        })
        .await?
    }

    pub async fn kick_session(
        &self,
        session_id: Option<SessionId>,
        account: Option<AccountName>,
    ) -> Result<Option<AccountName>, HubError> {
        self.request("KickSession", |reply| HubCommand::KickSession {
            session_id,
            account,
            reply,
        })
        .await?
    }

    pub async fn retrieve_registered_worldservers(
        &self,
        session_id: SessionId,
    ) -> Result<Option<ChannelList>, HubError> {
        self.request("RetrieveRegisteredWorldservers", |reply| {
            HubCommand::RetrieveRegisteredWorldservers { session_id, reply }
        })
        .await
    }

    /// Clears every pending login ticket. Returns how many were dropped.
    pub async fn cleanup(&self) -> Result<usize, HubError> {
        self.request("Cleanup", |reply| HubCommand::Cleanup { reply })
            .await
    }

    /// Subscribes to presence events.
    pub async fn subscribe(&self) -> Result<Subscription, HubError> {
        self.request("Subscribe", |reply| HubCommand::Subscribe { reply })
            .await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.request("Stats", |reply| HubCommand::Stats { reply }).await
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.sender
            .send(HubCommand::Shutdown)
            .await
            .map_err(|_| HubError::Unavailable)
    }
}

/// The actor state. Runs inside a Tokio task.
struct HubActor {
    hub: Hub,
    receiver: mpsc::Receiver<HubCommand>,
}

impl HubActor {
    async fn run(mut self) {
        tracing::info!("hub actor started");

        while let Some(command) = self.receiver.recv().await {
            if matches!(command, HubCommand::Shutdown) {
                tracing::info!("hub actor shutting down");
                break;
            }

            let op = command.name();
            let hub = &mut self.hub;
            if panic::catch_unwind(AssertUnwindSafe(|| apply(hub, command)))
                .is_err()
            {
                tracing::error!(op, "hub panicked while applying command");
            }
        }

        tracing::info!(stats = ?self.hub.stats(), "hub actor stopped");
    }
}

/// Applies one command and sends its reply. A caller that has gone away
/// just doesn't get the reply.
fn apply(hub: &mut Hub, command: HubCommand) {
    match command {
        HubCommand::RegisterWorldserver {
            group,
            server,
            reply,
        } => {
            let _ = reply.send(hub.register_worldserver(&group, server));
        }
        HubCommand::UnregisterWorldserver {
            group,
            endpoint,
            reply,
        } => {
            let result = hub
                .unregister_worldserver(&group, &endpoint)
                .map(|world| world.id());
            let _ = reply.send(result);
        }
        HubCommand::ClaimWorldserver {
            group,
            server,
            owner,
            reply,
        } => {
            let _ = reply.send(hub.claim_worldserver(&group, server, owner));
        }
        HubCommand::ReleaseWorldserver {
            group,
            endpoint,
            owner,
            reply,
        } => {
            let result = hub
                .release_worldserver(&group, &endpoint, owner)
                .map(|world| world.map(|w| w.id()));
            let _ = reply.send(result);
        }
        HubCommand::ConnectAccount {
            world_id,
            account,
            session_id,
            reply,
        } => {
            let _ =
                reply.send(hub.connect_account(world_id, account, session_id));
        }
        HubCommand::ConnectCharacter {
            world_id,
            character,
            account,
            reply,
        } => {
            let _ = reply
                .send(hub.connect_character(world_id, character, account));
        }
        HubCommand::DisconnectAccount { account, reply } => {
            let _ = reply.send(hub.disconnect_account(&account));
        }
        HubCommand::DisconnectCharacter {
            character,
            character_id,
            reply,
        } => {
            let _ =
                reply.send(hub.disconnect_character(&character, character_id));
        }
        HubCommand::AccountIsConnected { account, reply } => {
            let _ = reply.send(hub.account_is_connected(&account));
        }
        HubCommand::RegisterAccountLogin {
            account,
            session_id,
            reply,
        } => {
            let _ =
                reply.send(hub.register_account_login(account, session_id));
        }
        HubCommand::HasRegisteredAccountLogin {
            account,
            session_id,
            reply,
        } => {
            let _ = reply
                .send(hub.has_registered_account_login(&account, session_id));
        }
        HubCommand::KickSession {
            session_id,
            account,
            reply,
        } => {
            let _ = reply.send(hub.kick_session(session_id, account));
        }
        HubCommand::RetrieveRegisteredWorldservers { session_id, reply } => {
            let _ =
                reply.send(hub.retrieve_registered_worldservers(session_id));
        }
        HubCommand::Cleanup { reply } => {
            let _ = reply.send(hub.cleanup());
        }
        HubCommand::Subscribe { reply } => {
            let _ = reply.send(hub.subscribe());
        }
        HubCommand::Stats { reply } => {
            let _ = reply.send(hub.stats());
        }
        HubCommand::Shutdown => {}
    }
}
