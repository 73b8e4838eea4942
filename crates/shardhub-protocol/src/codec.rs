//! Byte encoding for envelopes.
//!
//! Connection handlers hold a [`Codec`] rather than calling `serde_json`
//! themselves. [`JsonCodec`] is the only implementation today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns serializable values into frames and frames back into values.
///
/// One codec value is shared by every connection task, hence the
/// `Send + Sync + 'static` bound.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// Fails on bytes that don't parse as `T`, and on frames over the
    /// codec's size limit.
    fn decode<T: DeserializeOwned>(&self, data: &[u8])
    -> Result<T, ProtocolError>;
}

/// Default cap on an inbound frame. A full channel list for a large
/// cluster fits in a few kilobytes; requests are much smaller.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// JSON frames via `serde_json`.
///
/// World servers and gateways are often not written in Rust. JSON keeps
/// the hub reachable from all of them and readable in a packet capture.
///
/// ```rust
/// use shardhub_protocol::{Codec, Envelope, HubRequest, JsonCodec, Payload};
///
/// let codec = JsonCodec::default();
/// let envelope = Envelope {
///     seq: 1,
///     payload: Payload::Request(HubRequest::Ping),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// assert_eq!(
///     std::str::from_utf8(&bytes).unwrap(),
///     r#"{"seq":1,"payload":{"type":"Request","data":{"type":"Ping"}}}"#
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    max_frame_len: usize,
}

#[cfg(feature = "json")]
impl JsonCodec {
    /// A codec that refuses inbound frames longer than `max_frame_len`.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

#[cfg(feature = "json")]
impl Default for JsonCodec {
    fn default() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }
}

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        if data.len() > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len: data.len(),
                max: self.max_frame_len,
            });
        }
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
