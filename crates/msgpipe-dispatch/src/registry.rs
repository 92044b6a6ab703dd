//! Handler registry keyed by message-type tag.
//!
//! Each entry pairs a request shape (any `Deserialize` type) with a handler
//! function. The registry is built once during setup and then moved into a
//! [`Dispatcher`](crate::Dispatcher), which only reads it.
//!
//! # Example
//!
//! ```
//! use msgpipe_dispatch::HandlerRegistry;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct Ping {}
//!
//! #[derive(Serialize)]
//! struct Pong {
//!     pong: bool,
//! }
//!
//! let registry = HandlerRegistry::new()
//!     .register("Ping", |_: Ping| Ok::<_, std::convert::Infallible>(Pong { pong: true }));
//! assert!(registry.contains("Ping"));
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{MsgPackCodec, PayloadCodec};
use crate::error::{BoxError, CodecError, DispatchError, Result};
use crate::message::{Fields, InboundMessage};

type ErasedHandler = Box<dyn Fn(&str, Fields) -> Result<Box<dyn EncodeReply>> + Send>;

/// A handler's return value, waiting to be encoded.
trait EncodeReply {
    fn encode(&self) -> std::result::Result<Vec<u8>, CodecError>;
}

struct TypedReply<C, T> {
    value: T,
    _codec: PhantomData<fn() -> C>,
}

impl<C: PayloadCodec, T: Serialize> EncodeReply for TypedReply<C, T> {
    fn encode(&self) -> std::result::Result<Vec<u8>, CodecError> {
        C::encode(&self.value)
    }
}

/// Result of invoking a handler, before encoding.
pub struct Reply {
    tag: String,
    value: Box<dyn EncodeReply>,
}

impl Reply {
    /// Tag of the request this reply answers.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Encode the handler's return value as a response payload.
    pub fn encode(self) -> Result<Vec<u8>> {
        self.value
            .encode()
            .map_err(|source| DispatchError::Encode {
                tag: self.tag,
                source,
            })
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply").field("tag", &self.tag).finish()
    }
}

struct HandlerEntry {
    request_type: &'static str,
    call: ErasedHandler,
}

/// Tag-keyed table of request shapes and handlers.
pub struct HandlerRegistry<C = MsgPackCodec> {
    handlers: HashMap<String, HandlerEntry>,
    _codec: PhantomData<fn() -> C>,
}

impl HandlerRegistry<MsgPackCodec> {
    /// Create an empty registry using MessagePack payloads.
    pub fn new() -> Self {
        Self::with_codec()
    }
}

impl<C: PayloadCodec> HandlerRegistry<C> {
    /// Create an empty registry using codec `C`.
    pub fn with_codec() -> Self {
        Self {
            handlers: HashMap::new(),
            _codec: PhantomData,
        }
    }

    /// Register a handler for `tag`.
    ///
    /// `Req` is the request shape the remaining fields are narrowed into.
    /// Registering the same tag again replaces the earlier handler.
    pub fn register<Req, Resp, E, F>(mut self, tag: impl Into<String>, handler: F) -> Self
    where
        Req: DeserializeOwned + 'static,
        Resp: Serialize + 'static,
        E: Into<BoxError>,
        F: Fn(Req) -> std::result::Result<Resp, E> + Send + 'static,
    {
        let tag = tag.into();
        let request_type = std::any::type_name::<Req>();

        let call: ErasedHandler = Box::new(
            move |tag: &str, fields: Fields| -> Result<Box<dyn EncodeReply>> {
                let request: Req = InboundMessage {
                    tag: tag.to_string(),
                    fields,
                }
                .narrow()?;

                let value = handler(request).map_err(|err| DispatchError::Handler {
                    tag: tag.to_string(),
                    source: err.into(),
                })?;

                Ok(Box::new(TypedReply::<C, Resp> {
                    value,
                    _codec: PhantomData,
                }))
            },
        );

        let entry = HandlerEntry { request_type, call };
        if self.handlers.insert(tag.clone(), entry).is_some() {
            warn!(%tag, request_type, "replacing previously registered handler");
        } else {
            debug!(%tag, request_type, "registered handler");
        }
        self
    }

    /// Look up and invoke the handler for a decoded message.
    pub fn invoke(&self, message: InboundMessage) -> Result<Reply> {
        let InboundMessage { tag, fields } = message;
        let entry = self
            .handlers
            .get(&tag)
            .ok_or_else(|| DispatchError::UnknownMessageType(tag.clone()))?;

        let value = (entry.call)(&tag, fields)?;
        Ok(Reply { tag, value })
    }

    /// Turn one request payload into one response payload.
    ///
    /// Decodes, looks up, narrows, invokes and encodes, with no I/O.
    pub fn dispatch(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let message = InboundMessage::decode::<C>(payload)?;
        self.invoke(message)?.encode()
    }

    /// Check if a handler is registered for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Request type name registered for `tag`.
    pub fn request_type(&self, tag: &str) -> Option<&'static str> {
        self.handlers.get(tag).map(|entry| entry.request_type)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry<MsgPackCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for HandlerRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.handlers.keys().collect();
        tags.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("tags", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::*;
    use crate::codec::JsonCodec;

    #[derive(Deserialize)]
    struct Ping {}

    #[derive(Serialize)]
    struct Pong {
        pong: bool,
    }

    #[derive(Deserialize)]
    struct Add {
        a: i64,
        b: i64,
    }

    fn ping(_: Ping) -> std::result::Result<Pong, Infallible> {
        Ok(Pong { pong: true })
    }

    fn json_registry() -> HandlerRegistry<JsonCodec> {
        HandlerRegistry::<JsonCodec>::with_codec()
            .register("Ping", ping)
            .register("Add", |req: Add| Ok::<_, Infallible>(json!({"sum": req.a + req.b})))
    }

    #[test]
    fn dispatch_ping() {
        let response = json_registry().dispatch(br#"{"$type":"Ping"}"#).unwrap();
        assert_eq!(response, br#"{"pong":true}"#);
    }

    #[test]
    fn dispatch_with_fields() {
        let response = json_registry()
            .dispatch(br#"{"$type":"Add","a":2,"b":40}"#)
            .unwrap();
        let value: Value = serde_json::from_slice(&response).unwrap();
        assert_eq!(value, json!({"sum": 42}));
    }

    #[test]
    fn dispatch_msgpack_default() {
        let registry = HandlerRegistry::new().register("Ping", ping);
        let request = MsgPackCodec::encode(&json!({"$type": "Ping"})).unwrap();

        let response = registry.dispatch(&request).unwrap();
        let value: Value = MsgPackCodec::decode(&response).unwrap();
        assert_eq!(value, json!({"pong": true}));
    }

    #[test]
    fn unknown_tag() {
        let err = json_registry()
            .dispatch(br#"{"$type":"Unregistered"}"#)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownMessageType(ref tag) if tag == "Unregistered"));
    }

    #[test]
    fn missing_tag_runs_no_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let registry = HandlerRegistry::<JsonCodec>::with_codec().register("Ping", move |_: Ping| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Pong { pong: true })
        });
        let err = registry.dispatch(br#"{"foo":1}"#).unwrap_err();
        assert!(matches!(err, DispatchError::MissingTypeTag));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_request() {
        let err = json_registry()
            .dispatch(br#"{"$type":"Add","a":2}"#)
            .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRequest { ref tag, .. } if tag == "Add"));
    }

    #[test]
    fn undeclared_field_is_malformed() {
        let registry = HandlerRegistry::new()
            .register("Add", |req: Add| Ok::<_, Infallible>(json!({"sum": req.a + req.b})));
        let request = MsgPackCodec::encode(&json!({"$type": "Add", "a": 1, "b": 2, "bogus": 9}))
            .unwrap();

        let err = registry.dispatch(&request).unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRequest { ref tag, .. } if tag == "Add"));
        assert!(err.to_string().contains("bogus"), "{err}");
    }

    #[test]
    fn binary_fields_reach_the_handler() {
        #[derive(Serialize, Deserialize)]
        struct Blob {
            #[serde(with = "serde_bytes")]
            data: Vec<u8>,
        }

        let registry = HandlerRegistry::new().register("Blob", |mut req: Blob| {
            req.data.reverse();
            Ok::<_, Infallible>(req)
        });

        let mut request = Vec::new();
        rmpv::encode::write_value(
            &mut request,
            &rmpv::Value::Map(vec![
                (rmpv::Value::from("$type"), rmpv::Value::from("Blob")),
                (rmpv::Value::from("data"), rmpv::Value::Binary(vec![1, 2, 3])),
            ]),
        )
        .unwrap();

        let response = MsgPackCodec::decode_value(&registry.dispatch(&request).unwrap()).unwrap();
        assert_eq!(
            response,
            rmpv::Value::Map(vec![(
                rmpv::Value::from("data"),
                rmpv::Value::Binary(vec![3, 2, 1])
            )])
        );
    }

    #[test]
    fn nan_fields_reach_the_handler() {
        #[derive(Deserialize)]
        struct Scale {
            x: f64,
        }

        let registry = HandlerRegistry::new()
            .register("Scale", |req: Scale| Ok::<_, Infallible>(json!({"nan": req.x.is_nan()})));

        let mut request = Vec::new();
        rmpv::encode::write_value(
            &mut request,
            &rmpv::Value::Map(vec![
                (rmpv::Value::from("$type"), rmpv::Value::from("Scale")),
                (rmpv::Value::from("x"), rmpv::Value::from(f64::NAN)),
            ]),
        )
        .unwrap();

        let response: Value = MsgPackCodec::decode(&registry.dispatch(&request).unwrap()).unwrap();
        assert_eq!(response, json!({"nan": true}));
    }

    #[test]
    fn handler_failure_propagates() {
        let registry = HandlerRegistry::<JsonCodec>::with_codec().register("Fail", |_: Ping| {
            Err::<Pong, _>(std::io::Error::other("disk on fire"))
        });

        let err = registry.dispatch(br#"{"$type":"Fail"}"#).unwrap_err();
        match err {
            DispatchError::Handler { tag, source } => {
                assert_eq!(tag, "Fail");
                assert_eq!(source.to_string(), "disk on fire");
            }
            other => panic!("expected handler error, got {other:?}"),
        }
    }

    #[test]
    fn unencodable_response() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(
                &self,
                _serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot encode"))
            }
        }

        let registry = HandlerRegistry::new()
            .register("Bad", |_: Ping| Ok::<_, Infallible>(Unencodable));
        let request = MsgPackCodec::encode(&json!({"$type": "Bad"})).unwrap();

        let err = registry.dispatch(&request).unwrap_err();
        assert!(matches!(err, DispatchError::Encode { ref tag, .. } if tag == "Bad"));
    }

    #[test]
    fn last_registration_wins() {
        let registry = HandlerRegistry::<JsonCodec>::with_codec()
            .register("Ping", ping)
            .register("Ping", |_: Ping| Ok::<_, Infallible>(json!({"pong": "second"})));

        assert_eq!(registry.len(), 1);
        let response = registry.dispatch(br#"{"$type":"Ping"}"#).unwrap();
        assert_eq!(response, br#"{"pong":"second"}"#);
    }

    #[test]
    fn introspection() {
        let registry = json_registry();

        assert_eq!(registry.tags(), vec!["Add", "Ping"]);
        assert!(registry.contains("Add"));
        assert!(!registry.contains("Sub"));
        assert!(!registry.is_empty());
        assert!(registry
            .request_type("Add")
            .is_some_and(|name| name.ends_with("Add")));
        assert!(format!("{registry:?}").contains("Ping"));
    }

    #[test]
    fn invoke_returns_reply_with_tag() {
        let registry = json_registry();
        let message = InboundMessage::from_value(rmpv::Value::Map(vec![(
            rmpv::Value::from("$type"),
            rmpv::Value::from("Ping"),
        )]))
        .unwrap();

        let reply = registry.invoke(message).unwrap();
        assert_eq!(reply.tag(), "Ping");
        assert_eq!(reply.encode().unwrap(), br#"{"pong":true}"#);
    }

    #[test]
    fn empty_registry() {
        let registry = HandlerRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.tags().is_empty());
    }
}
