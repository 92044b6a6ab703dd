//! Payload codecs.
//!
//! A codec turns values into frame payloads and back. It is chosen
//! statically as a type parameter of the registry, dispatcher and client:
//!
//! - [`MsgPackCodec`] - MessagePack via `rmp-serde` (default)
//! - [`JsonCodec`] - JSON via `serde_json`, handy when debugging by hand

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Serialization capability used for payloads.
pub trait PayloadCodec: 'static {
    /// Short name for logs and diagnostics.
    const NAME: &'static str;

    /// Encode a value to payload bytes.
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode payload bytes to a value.
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError>;

    /// Decode payload bytes to a generic value, losing nothing the
    /// encoding can express.
    fn decode_value(bytes: &[u8]) -> Result<Value, CodecError> {
        Self::decode(bytes)
    }
}

/// MessagePack codec.
///
/// Structs are written with `rmp_serde::to_vec_named` so they become maps
/// keyed by field name, which is what JavaScript and Python peers expect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl PayloadCodec for MsgPackCodec {
    const NAME: &'static str = "msgpack";

    #[inline]
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    #[inline]
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Reads with `rmpv` directly so `bin`, `ext` and non-finite floats
    /// come through intact.
    fn decode_value(mut bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(rmpv::decode::read_value(&mut bytes)?)
    }
}

/// JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    const NAME: &'static str = "json";

    #[inline]
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    #[inline]
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
