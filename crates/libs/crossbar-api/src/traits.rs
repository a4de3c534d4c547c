use std::time::Duration;

use async_trait::async_trait;
use rmpv::Value;

use crate::error::{BrokerError, TransportError};
use crate::types::{Message, ResponseBody, SessionId};

/// Message-passing surface of the transport layer.
///
/// The dispatch core never touches sockets or wire framing; it pulls decoded
/// envelopes from here and pushes shaped responses back.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Waits up to `timeout` for the next inbound envelope.
    ///
    /// `Ok(None)` means the bounded wait elapsed with nothing to deliver,
    /// which is not an error.
    async fn recv(&self, timeout: Duration) -> Result<Option<Message>, TransportError>;

    /// Transmits a response, consuming it.
    async fn send(&self, message: Message) -> Result<(), TransportError>;
}

/// Business-logic collaborator invoked by the dispatch core.
///
/// Session ids are opaque to the core; every operation that takes a `sid`
/// validates it here.
#[async_trait]
pub trait ServiceBroker: Send + Sync {
    /// Executes `method` on `object` with `args`, writing its own
    /// `result`/`error` shape into `out`.
    ///
    /// The returned status is observed only for logging; the response the
    /// peer sees is whatever was written into `out`.
    async fn call(
        &self,
        sid: &str,
        object: &str,
        method: &str,
        args: &Value,
        out: &mut ResponseBody,
    ) -> Result<(), BrokerError>;

    /// Produces the listing value for `path`, placed under `result` by the
    /// caller.
    async fn list(&self, sid: &str, path: &str) -> Value;

    /// Authenticates `username` against a challenge `token` and `response`,
    /// yielding the session on success.
    async fn login(
        &self,
        username: &str,
        token: &str,
        response: &str,
    ) -> Result<SessionId, BrokerError>;

    /// Tears down the session identified by `sid`.
    async fn logout(&self, sid: &str) -> Result<(), BrokerError>;
}
