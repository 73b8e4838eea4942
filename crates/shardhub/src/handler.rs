//! Per-connection handler: request dispatch and event forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The loop waits on three things at once:
//!   1. an inbound frame → decode → dispatch to the hub → send the reply
//!   2. a presence event (after `Subscribe`) → push it as an `Event`
//!   3. the idle deadline → close the connection, unless the transport
//!      saw any frame (a WebSocket ping included) within the timeout
//!
//! Hub failures never reach the peer as errors. They are logged here,
//! according to their [`ErrorKind`], and answered with the operation's
//! plain failure value.

use std::sync::Arc;
use std::time::Duration;

use shardhub_protocol::{
    Codec, Endpoint, Envelope, HubReply, HubRequest, Payload, PresenceEvent,
};
use shardhub_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::time::Instant;

use crate::broadcast::Subscription;
use crate::server::ServerState;
use crate::{ErrorKind, HubError, HubHandle, ShardhubError};

/// Drop guard that releases the world servers a connection registered.
///
/// A world-server process that dies takes its connection with it, and
/// this is what removes it from the cluster. An endpoint that a newer
/// connection has re-registered since is left alone. Since `Drop` is
/// synchronous, the release runs in a spawned task.
struct RegistrationGuard {
    conn_id: ConnectionId,
    hub: HubHandle,
    enabled: bool,
    registered: Vec<(String, Endpoint)>,
}

impl RegistrationGuard {
    fn track(&mut self, group: String, endpoint: Endpoint) {
        if !self.registered.iter().any(|(_, e)| *e == endpoint) {
            self.registered.push((group, endpoint));
        }
    }

    fn forget(&mut self, endpoint: &Endpoint) {
        self.registered.retain(|(_, e)| e != endpoint);
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if !self.enabled || self.registered.is_empty() {
            return;
        }
        let conn_id = self.conn_id;
        let hub = self.hub.clone();
        let registered = std::mem::take(&mut self.registered);
        tokio::spawn(async move {
            for (group, endpoint) in registered {
                match hub.release_worldserver(&group, &endpoint, conn_id).await
                {
                    Ok(Some(world_id)) => tracing::info!(
                        %conn_id,
                        %world_id,
                        %endpoint,
                        "world server unregistered with its connection"
                    ),
                    Ok(None) => tracing::debug!(
                        %conn_id,
                        %endpoint,
                        "world server owned by a newer connection, kept"
                    ),
                    Err(e) => tracing::debug!(
                        %conn_id,
                        %endpoint,
                        error = %e,
                        "unregister on disconnect skipped"
                    ),
                }
            }
        });
    }
}

/// Connection-local state the dispatcher can change.
struct ConnectionState {
    guard: RegistrationGuard,
    subscription: Option<Subscription>,
    seq: u64,
}

impl ConnectionState {
    fn next_seq(&mut self) -> u64 {
        let current = self.seq;
        self.seq += 1;
        current
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ShardhubError> {
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let mut local = ConnectionState {
        guard: RegistrationGuard {
            conn_id,
            hub: state.hub.clone(),
            enabled: state.config.unregister_on_disconnect,
            registered: Vec::new(),
        },
        subscription: None,
        seq: 1,
    };
    let idle_timeout = state.config.idle_timeout();
    let mut deadline = idle_timeout.map(|t| Instant::now() + t);

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                handle_frame(&conn, &state, &mut local, &data).await?;
            }
            event = next_event(&mut local.subscription) => {
                match event {
                    Some(event) => {
                        send_event(&conn, &state.codec, &mut local, event)
                            .await?;
                    }
                    None => {
                        tracing::debug!(%conn_id, "event stream ended");
                        local.subscription = None;
                    }
                }
            }
            () = idle(deadline) => {
                // Control frames never surface from `recv`, so the
                // deadline is checked against the transport's own clock.
                let resume = idle_timeout.map(|t| conn.last_activity() + t);
                if resume.is_some_and(|at| at > Instant::now()) {
                    deadline = resume;
                    continue;
                }
                tracing::info!(
                    %conn_id,
                    timeout = ?idle_timeout,
                    "connection idle, closing"
                );
                let _ = conn.close().await;
                break;
            }
        }
    }

    // local.guard drops here → owned world servers are released.
    Ok(())
}

/// Decodes one frame and answers it. Frames that don't decode, or that
/// aren't requests, are logged and skipped.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    local: &mut ConnectionState,
    data: &[u8],
) -> Result<(), ShardhubError> {
    let conn_id = conn.id();
    let envelope: Envelope = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
            return Ok(());
        }
    };

    let request = match envelope.payload {
        Payload::Request(request) => request,
        _ => {
            tracing::debug!(%conn_id, "ignoring non-request payload");
            return Ok(());
        }
    };

    tracing::trace!(%conn_id, op = request.name(), seq = envelope.seq, "request");
    let reply = dispatch(&state.hub, local, request).await;

    let response = Envelope {
        seq: local.next_seq(),
        payload: Payload::Response {
            reply_to: envelope.seq,
            reply,
        },
    };
    let bytes = state.codec.encode(&response)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Runs one request against the hub and shapes the wire reply.
async fn dispatch(
    hub: &HubHandle,
    local: &mut ConnectionState,
    request: HubRequest,
) -> HubReply {
    let op = request.name();
    match request {
        HubRequest::RegisterWorldserver { group, server } => {
            let endpoint = server.endpoint.clone();
            let owner = local.guard.conn_id;
            if settle(op, hub.claim_worldserver(&group, server, owner).await)
                .is_some()
            {
                local.guard.track(group, endpoint);
            }
            HubReply::Done
        }
        HubRequest::UnregisterWorldserver { group, endpoint } => {
            local.guard.forget(&endpoint);
            settle(op, hub.unregister_worldserver(&group, &endpoint).await);
            HubReply::Done
        }
        HubRequest::ConnectAccount {
            world_id,
            account,
            session_id,
        } => {
            let result = hub.connect_account(world_id, account, session_id).await;
            HubReply::Bool {
                value: settle(op, result).is_some(),
            }
        }
        HubRequest::ConnectCharacter {
            world_id,
            character,
            account,
        } => {
            let result =
                hub.connect_character(world_id, character, account).await;
            HubReply::Bool {
                value: settle(op, result).is_some(),
            }
        }
        HubRequest::DisconnectAccount { account } => {
            settle(op, hub.disconnect_account(account).await);
            HubReply::Done
        }
        HubRequest::DisconnectCharacter {
            character,
            character_id,
        } => {
            settle(op, hub.disconnect_character(character, character_id).await);
            HubReply::Done
        }
        HubRequest::AccountIsConnected { account } => HubReply::Bool {
            value: settle(op, hub.account_is_connected(account).await)
                .unwrap_or(false),
        },
        HubRequest::RegisterAccountLogin {
            account,
            session_id,
        } => {
            settle(op, hub.register_account_login(account, session_id).await);
            HubReply::Done
        }
        HubRequest::HasRegisteredAccountLogin {
            account,
            session_id,
        } => {
            let result =
                hub.has_registered_account_login(account, session_id).await;
            HubReply::Bool {
                value: settle(op, result).is_some(),
            }
        }
        HubRequest::KickSession {
            session_id,
            account,
        } => {
            settle(op, hub.kick_session(session_id, account).await);
            HubReply::Done
        }
        HubRequest::RetrieveRegisteredWorldservers { session_id } => {
            let list = settle(
                op,
                hub.retrieve_registered_worldservers(session_id).await,
            );
            HubReply::Channels {
                list: list.flatten().map(|l| l.to_string()),
            }
        }
        HubRequest::Cleanup => {
            settle(op, hub.cleanup().await);
            HubReply::Done
        }
        HubRequest::Subscribe => {
            if local.subscription.is_none() {
                local.subscription = settle(op, hub.subscribe().await);
            }
            HubReply::Done
        }
        HubRequest::Ping => HubReply::Pong,
    }
}

/// Turns a hub result into an `Option`, logging the failure by kind.
fn settle<T>(op: &'static str, result: Result<T, HubError>) -> Option<T> {
    let error = match result {
        Ok(value) => return Some(value),
        Err(e) => e,
    };
    match error.kind() {
        ErrorKind::Invalid => {
            tracing::warn!(op, %error, "invalid request ignored");
        }
        ErrorKind::NotFound => {
            tracing::info!(op, %error, "nothing to do");
        }
        ErrorKind::Conflict => {
            tracing::info!(op, %error, "request refused");
        }
        ErrorKind::Internal => {
            tracing::error!(op, error = ?error, "hub fault");
        }
    }
    None
}

async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    local: &mut ConnectionState,
    event: PresenceEvent,
) -> Result<(), ShardhubError> {
    let envelope = Envelope {
        seq: local.next_seq(),
        payload: Payload::Event(event),
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// The next event, or never if the connection hasn't subscribed.
async fn next_event(
    subscription: &mut Option<Subscription>,
) -> Option<PresenceEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

/// Completes at `deadline`, or never if there is none.
async fn idle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
