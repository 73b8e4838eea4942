//! Messages exchanged between the hub and its callers.
//!
//! Callers (world servers, login gateways, admin tools) send
//! [`HubRequest`]s. The hub answers each one with exactly one
//! [`HubReply`], and pushes [`PresenceEvent`]s to every caller that has
//! subscribed. All three travel inside an [`Envelope`].
//!
//! Replies are deliberately shaped like the operations' natural results:
//! a boolean, an optional string, or a bare acknowledgement. There is no
//! error payload. A caller whose request failed for any reason sees the
//! same `false`/`null` as a caller whose request was refused.

use serde::{Deserialize, Serialize};

use crate::{
    AccountName, CharacterId, CharacterName, Endpoint, SessionId, WorldId,
    WorldServerInfo,
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// An operation a caller asks the hub to perform.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "AccountIsConnected", "account": "bob" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubRequest {
    // -- Shard group membership --
    /// A world server announces itself under a group name.
    RegisterWorldserver {
        group: String,
        server: WorldServerInfo,
    },

    /// A world server leaves. The group name is a hint; the endpoint is
    /// what identifies the server.
    UnregisterWorldserver { group: String, endpoint: Endpoint },

    // -- Presence --
    ConnectAccount {
        world_id: WorldId,
        account: AccountName,
        session_id: SessionId,
    },

    ConnectCharacter {
        world_id: WorldId,
        character: CharacterName,
        account: AccountName,
    },

    DisconnectAccount { account: AccountName },

    DisconnectCharacter {
        character: CharacterName,
        character_id: CharacterId,
    },

    AccountIsConnected { account: AccountName },

    // -- Login tickets --
    RegisterAccountLogin {
        account: AccountName,
        session_id: SessionId,
    },

    HasRegisteredAccountLogin {
        account: AccountName,
        session_id: SessionId,
    },

    // -- Administration --
    /// Force a session off the cluster. At least one field must be set.
    KickSession {
        #[serde(default)]
        session_id: Option<SessionId>,
        #[serde(default)]
        account: Option<AccountName>,
    },

    /// Build the channel-discovery string for a connecting client.
    RetrieveRegisteredWorldservers { session_id: SessionId },

    /// Drop every pending login ticket.
    Cleanup,

    // -- Connection plumbing --
    /// Start receiving [`PresenceEvent`]s on this connection.
    ///
    /// Pushed events don't count as activity from the caller. A connection
    /// that only listens must still send `Ping` (or WebSocket pings) within
    /// the hub's idle timeout.
    Subscribe,

    /// Keep-alive. Answered with [`HubReply::Pong`].
    ///
    /// Any inbound frame resets the idle timeout, so this is only needed by
    /// callers that otherwise go quiet, such as subscribed gateways.
    Ping,
}

impl HubRequest {
    /// The operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterWorldserver { .. } => "RegisterWorldserver",
            Self::UnregisterWorldserver { .. } => "UnregisterWorldserver",
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
            Self::Cleanup => "Cleanup",
            Self::Subscribe => "Subscribe",
            Self::Ping => "Ping",
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// The hub's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubReply {
    /// The request was handled. Used by operations with no result.
    Done,

    /// Result of a yes/no operation (connect, ticket redemption, ...).
    Bool { value: bool },

    /// Channel-discovery string, or `None` when no groups exist.
    Channels { list: Option<String> },

    Pong,
}

// ---------------------------------------------------------------------------
// Presence events
// ---------------------------------------------------------------------------

/// A presence change pushed to every subscriber.
///
/// Events carry no sequence numbers. Subscribers must tolerate seeing an
/// event twice or out of order relative to their own requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PresenceEvent {
    AccountConnected {
        account: AccountName,
        session_id: SessionId,
    },
    AccountDisconnected {
        account: AccountName,
    },
    CharacterConnected {
        character: CharacterName,
    },
    CharacterDisconnected {
        character: CharacterName,
        character_id: CharacterId,
    },
    /// Whoever owns the socket for this session should drop it.
    KickSession {
        session_id: Option<SessionId>,
        account: Option<AccountName>,
    },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged so the handler can branch on the outer `type`
/// before looking at the inner message:
///   `{ "type": "Request", "data": { "type": "Ping" } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Caller → hub.
    Request(HubRequest),

    /// Hub → caller, answering the envelope whose `seq` is `reply_to`.
    Response { reply_to: u64, reply: HubReply },

    /// Hub → subscriber.
    Event(PresenceEvent),
}

/// The top-level wire message. Every frame on a hub connection is one
/// `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender-side sequence number. Each side keeps its own counter;
    /// responses echo the request's number in `reply_to`.
    pub seq: u64,

    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! These pin the JSON shapes callers depend on. A world server written
    //! against an older shape must keep parsing what the hub sends.

    use super::*;

    #[test]
    fn test_request_connect_account_json_format() {
        let req = HubRequest::ConnectAccount {
            world_id: WorldId(3),
            account: AccountName::new("Bob"),
            session_id: SessionId(11),
        };
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["type"], "ConnectAccount");
        assert_eq!(json["world_id"], 3);
        assert_eq!(json["account"], "bob");
        assert_eq!(json["session_id"], 11);
    }

    #[test]
    fn test_request_kick_session_fields_default_to_none() {
        let req: HubRequest =
            serde_json::from_str(r#"{ "type": "KickSession" }"#).unwrap();
        assert_eq!(
            req,
            HubRequest::KickSession {
                session_id: None,
                account: None,
            }
        );
    }

    #[test]
    fn test_request_unit_variants_parse() {
        let req: HubRequest =
            serde_json::from_str(r#"{ "type": "Cleanup" }"#).unwrap();
        assert_eq!(req, HubRequest::Cleanup);

        let req: HubRequest =
            serde_json::from_str(r#"{ "type": "Subscribe" }"#).unwrap();
        assert_eq!(req, HubRequest::Subscribe);
    }

    #[test]
    fn test_request_register_worldserver_parses_nested_server() {
        let json = r#"{
            "type": "RegisterWorldserver",
            "group": "Act1",
            "server": {
                "id": 99,
                "endpoint": { "host": "127.0.0.1", "port": 4000 },
                "account_limit": 500
            }
        }"#;
        let req: HubRequest = serde_json::from_str(json).unwrap();
        match req {
            HubRequest::RegisterWorldserver { group, server } => {
                assert_eq!(group, "Act1");
                assert_eq!(server.endpoint, Endpoint::new("127.0.0.1", 4000));
                assert_eq!(server.account_limit, 500);
            }
            other => panic!("expected RegisterWorldserver, got {other:?}"),
        }
    }

    #[test]
    fn test_request_name_matches_tag() {
        let req = HubRequest::RetrieveRegisteredWorldservers {
            session_id: SessionId(1),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], req.name());
    }

    #[test]
    fn test_reply_channels_null_when_empty() {
        let json =
            serde_json::to_value(&HubReply::Channels { list: None }).unwrap();
        assert_eq!(json["type"], "Channels");
        assert!(json["list"].is_null());
    }

    #[test]
    fn test_event_character_disconnected_json_format() {
        let event = PresenceEvent::CharacterDisconnected {
            character: CharacterName::new("Hero"),
            character_id: CharacterId(5),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "CharacterDisconnected");
        assert_eq!(json["character"], "Hero");
        assert_eq!(json["character_id"], 5);
    }

    #[test]
    fn test_payload_response_json_format() {
        let payload = Payload::Response {
            reply_to: 9,
            reply: HubReply::Bool { value: true },
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "Response");
        assert_eq!(json["data"]["reply_to"], 9);
        assert_eq!(json["data"]["reply"]["type"], "Bool");
        assert_eq!(json["data"]["reply"]["value"], true);
    }

    #[test]
    fn test_envelope_request_parses_from_caller_json() {
        let json = r#"{
            "seq": 4,
            "payload": {
                "type": "Request",
                "data": { "type": "AccountIsConnected", "account": "ALICE" }
            }
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.seq, 4);
        assert_eq!(
            envelope.payload,
            Payload::Request(HubRequest::AccountIsConnected {
                account: AccountName::new("alice"),
            })
        );
    }

    #[test]
    fn test_decode_unknown_request_type_returns_error() {
        let unknown = r#"{ "type": "FlyToMoon" }"#;
        let result: Result<HubRequest, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let result: Result<Envelope, _> = serde_json::from_slice(b"not json");
        assert!(result.is_err());
    }
}
