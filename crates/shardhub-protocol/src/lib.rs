//! Wire protocol for the shardhub coordination hub.
//!
//! This crate defines what travels between the hub and its callers:
//!
//! - **Identity types** ([`WorldId`], [`SessionId`], [`AccountName`], ...)
//!   shared by every other layer.
//! - **Messages** ([`Envelope`], [`HubRequest`], [`HubReply`],
//!   [`PresenceEvent`]).
//! - **Channel lists** ([`ChannelList`]): the bit-exact discovery string
//!   clients parse.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Hub (operations)
//! ```

mod channels;
mod codec;
mod error;
mod message;
mod types;

pub use channels::{
    CHANNEL_LIST_MARKER, ChannelEntry, ChannelList, DEFAULT_CHANNEL_COLOR,
};
pub use codec::{Codec, DEFAULT_MAX_FRAME_LEN};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{Envelope, HubReply, HubRequest, Payload, PresenceEvent};
pub use types::{
    AccountName, CharacterId, CharacterName, Endpoint, SessionId, WorldId,
    WorldServerInfo,
};
