//! Identity types shared by every layer of the hub.
//!
//! Everything that names a thing in the cluster lives here: world servers,
//! player sessions, accounts, characters, and the network endpoints world
//! servers listen on. These types travel on the wire, so each one controls
//! its own serde representation.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Numeric identifiers
// ---------------------------------------------------------------------------

/// Identifies one world-server process.
///
/// A world server picks its id once at startup (see [`WorldId::random`])
/// and presents it on registration. It stays the same for the lifetime of
/// that process; a restarted process registers with a fresh id.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub u64);

impl WorldId {
    /// Generates a random world id (64 bits of entropy).
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self(rng.random())
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W-{:016x}", self.0)
    }
}

/// A player's socket session on a world server.
///
/// Session ids are allocated by the world servers and gateways, not by the
/// hub. The hub only stores and compares them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// The game-side database id of a character. Carried through to
/// disconnect notifications; the hub never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u64);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// An account name, normalized to lower case.
///
/// Account names are case-insensitive everywhere in the cluster: "Bob",
/// "BOB" and "bob" are the same account. Rather than remember to lowercase
/// at every comparison, the normalization happens once, when the value is
/// built. There is no way to construct an `AccountName` that isn't lower
/// case, so a `HashMap<AccountName, _>` is automatically case-insensitive.
///
/// Deserialization goes through [`From<String>`], so names arriving over
/// the wire are normalized too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    /// Builds a normalized account name.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// The normalized (lower-case) name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty name, which identifies nobody.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for AccountName {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<&str> for AccountName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A character name. Unlike account names these are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterName(String);

impl CharacterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CharacterName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for CharacterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// World servers
// ---------------------------------------------------------------------------

/// The address other processes (and game clients) use to reach a world
/// server. Two registrations with the same endpoint are the same server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// What a world server tells the hub about itself when it registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldServerInfo {
    /// The process's id, chosen by the world server at startup.
    pub id: WorldId,

    /// Where clients connect to reach this world server.
    pub endpoint: Endpoint,

    /// Advisory maximum number of concurrent accounts. Not enforced.
    #[serde(default)]
    pub account_limit: u32,
}

// =========================================================================
// Tests
// =========================================================================
