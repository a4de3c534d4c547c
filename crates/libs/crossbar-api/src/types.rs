use rmpv::Value;

/// A structured-value envelope paired with the transport endpoint it belongs
/// to.
///
/// A message is created when the transport delivers an envelope and consumed
/// when the response for it is sent (or immediately, if the envelope fails
/// top-level parsing). Each worker exclusively owns the message it is
/// currently processing; nothing here is shared.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Opaque handle to the transport endpoint that produced this envelope.
    pub peer: u32,
    /// The decoded structured value carried on the wire.
    pub body: Value,
}

impl Message {
    /// Creates an empty message addressed to `peer`.
    pub fn new(peer: u32) -> Self {
        Self {
            peer,
            body: Value::Nil,
        }
    }

    /// Creates a message from a decoded wire value.
    pub fn with_body(peer: u32, body: Value) -> Self {
        Self { peer, body }
    }
}

/// The `result`/`error` slot of a response envelope.
///
/// At most one of the two is ever present on the wire. `Empty` renders as a
/// response with neither field, reachable on the `list` path when parameter
/// parsing fails, and on a `call` whose broker writes nothing back.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Result(Value),
    Error(Value),
}

impl ResponseBody {
    /// Replaces the body with a `result` value.
    pub fn set_result(&mut self, value: Value) {
        *self = Self::Result(value);
    }

    /// Replaces the body with an `error` value.
    pub fn set_error(&mut self, value: Value) {
        *self = Self::Error(value);
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Opaque authentication token issued by `login`.
///
/// The dispatch core never validates a session id; downstream broker
/// operations do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId {
    pub hash: String,
}

impl SessionId {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}
