//! Generic message values at the decode boundary.
//!
//! Inbound payloads are decoded into an [`rmpv::Value`], which holds every
//! MessagePack type including `bin`, `ext` and non-finite floats. The value
//! is checked to be a map, split into the `$type` tag and the remaining
//! [`Fields`], and then narrowed into the handler's request type. The
//! untyped value never reaches a handler.

use rmpv::Value;
use serde::de::{DeserializeOwned, Error as _};
use serde::Serialize;

use crate::codec::PayloadCodec;
use crate::error::{CodecError, DispatchError, Result};

/// Reserved key naming the handler an inbound map is addressed to.
pub const TYPE_KEY: &str = "$type";

/// Request fields left after removing the tag, in wire order.
pub type Fields = Vec<(Value, Value)>;

/// A decoded inbound message: the tag plus the request fields.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub tag: String,
    pub fields: Fields,
}

impl InboundMessage {
    /// Decode a frame payload with codec `C` and split off the tag.
    pub fn decode<C: PayloadCodec>(payload: &[u8]) -> Result<Self> {
        let value = C::decode_value(payload).map_err(DispatchError::Decode)?;
        Self::from_value(value)
    }

    /// Split a decoded value into tag and fields.
    ///
    /// If the map repeats `$type`, the last occurrence wins.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut fields = match value {
            Value::Map(fields) => fields,
            other => {
                return Err(DispatchError::Decode(CodecError::NotAMap {
                    found: value_kind(&other),
                }))
            }
        };

        let mut tag = None;
        fields.retain_mut(|(key, value)| {
            if key.as_str() != Some(TYPE_KEY) {
                return true;
            }
            tag = Some(std::mem::replace(value, Value::Nil));
            false
        });

        let tag = match tag {
            Some(Value::String(tag)) => match tag.into_str() {
                Some(tag) => tag,
                None => {
                    return Err(DispatchError::InvalidTypeTag {
                        found: "non-UTF-8 string",
                    })
                }
            },
            Some(other) => {
                return Err(DispatchError::InvalidTypeTag {
                    found: value_kind(&other),
                })
            }
            None => return Err(DispatchError::MissingTypeTag),
        };

        Ok(Self { tag, fields })
    }

    /// Build the typed request from the fields.
    ///
    /// Fails with [`DispatchError::MalformedRequest`] when a field is
    /// missing, mistyped, not named by a string, or not declared by `T`.
    pub fn narrow<T: DeserializeOwned>(self) -> Result<T> {
        let InboundMessage { tag, fields } = self;

        if let Some((key, _)) = fields.iter().find(|(key, _)| key.as_str().is_none()) {
            return Err(DispatchError::MalformedRequest {
                tag,
                source: rmpv::ext::Error::custom(format!(
                    "field names must be strings, found {}",
                    value_kind(key)
                )),
            });
        }

        let mut unknown = Vec::new();
        let request = serde_ignored::deserialize(Value::Map(fields), |path| {
            unknown.push(path.to_string())
        });
        let request: T = match request {
            Ok(request) => request,
            Err(source) => return Err(DispatchError::MalformedRequest { tag, source }),
        };

        if !unknown.is_empty() {
            return Err(DispatchError::MalformedRequest {
                tag,
                source: rmpv::ext::Error::custom(format!(
                    "unknown field `{}`",
                    unknown.join("`, `")
                )),
            });
        }
        Ok(request)
    }
}

/// Serialize a request as a map and put the `$type` key first.
pub(crate) fn tagged_request<T: Serialize + ?Sized>(tag: &str, request: &T) -> Result<Value> {
    let invalid = |reason: String| DispatchError::InvalidRequest {
        tag: tag.to_string(),
        reason,
    };

    let bytes = rmp_serde::to_vec_named(request).map_err(|err| invalid(err.to_string()))?;
    let value =
        rmpv::decode::read_value(&mut bytes.as_slice()).map_err(|err| invalid(err.to_string()))?;

    let mut fields = match value {
        Value::Map(fields) => fields,
        other => {
            return Err(invalid(format!(
                "serialized to {}, expected a map",
                value_kind(&other)
            )))
        }
    };
    fields.retain(|(key, _)| key.as_str() != Some(TYPE_KEY));
    fields.insert(0, (Value::from(TYPE_KEY), Value::from(tag)));
    Ok(Value::Map(fields))
}

/// Human-readable kind of a generic value.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) | Value::F32(_) | Value::F64(_) => "number",
        Value::String(_) => "string",
        Value::Binary(_) => "binary",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(..) => "extension",
    }
}
