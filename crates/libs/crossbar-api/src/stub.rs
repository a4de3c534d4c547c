use async_trait::async_trait;
use rmpv::Value;

use crate::error::BrokerError;
use crate::traits::ServiceBroker;
use crate::types::{ResponseBody, SessionId};

/// A broker that rejects every operation.
///
/// Wiring this into `crossbard` brings the daemon up before any business
/// logic exists; stubs are then swapped for real operations one at a time.
/// `list` answers with an empty table so listing clients see a well-formed
/// result.
pub struct StubBroker;

#[async_trait]
impl ServiceBroker for StubBroker {
    async fn call(
        &self,
        _sid: &str,
        object: &str,
        method: &str,
        _args: &Value,
        out: &mut ResponseBody,
    ) -> Result<(), BrokerError> {
        out.set_error(Value::Map(vec![(
            Value::from("str"),
            Value::from(format!("no such object: {object}.{method}")),
        )]));
        Err(BrokerError::not_implemented("call"))
    }

    async fn list(&self, _sid: &str, _path: &str) -> Value {
        Value::Map(Vec::new())
    }

    async fn login(
        &self,
        _username: &str,
        _token: &str,
        _response: &str,
    ) -> Result<SessionId, BrokerError> {
        Err(BrokerError::not_implemented("login"))
    }

    async fn logout(&self, _sid: &str) -> Result<(), BrokerError> {
        Err(BrokerError::not_implemented("logout"))
    }
}
