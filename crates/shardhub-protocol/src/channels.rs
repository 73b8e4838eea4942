//! The channel-discovery string shown to a connecting client.
//!
//! Clients consume one space-delimited line:
//!
//! ```text
//! NsTeST <session> <ip>:<port>:<color>:<group>.<channel>.<name> ...
//! ```
//!
//! Every entry is followed by a single space, including the last one.
//! Group and channel indices are 1-based and only mean something inside
//! the response that carries them.

use std::fmt;

use crate::{Endpoint, SessionId};

/// The literal tag that opens every channel list.
pub const CHANNEL_LIST_MARKER: &str = "NsTeST";

/// Color code sent for every channel.
pub const DEFAULT_CHANNEL_COLOR: u8 = 1;

/// One selectable channel: a single world server within a shard group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub endpoint: Endpoint,
    pub color: u8,
    /// 1-based position of the group in the registry.
    pub group_index: usize,
    /// 1-based position of the server within its group.
    pub channel_index: usize,
    pub group_name: String,
}

impl fmt::Display for ChannelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}.{}.{} ",
            self.endpoint,
            self.color,
            self.group_index,
            self.channel_index,
            self.group_name
        )
    }
}

/// A full channel-discovery response for one client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelList {
    pub session_id: SessionId,
    pub entries: Vec<ChannelEntry>,
}

impl fmt::Display for ChannelList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The raw number, not SessionId's "S-" display form.
        write!(f, "{CHANNEL_LIST_MARKER} {} ", self.session_id.0)?;
        for entry in &self.entries {
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
