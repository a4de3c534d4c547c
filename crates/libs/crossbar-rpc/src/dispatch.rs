//! One receive→parse→route→respond cycle.

use std::time::Duration;

use crossbar_api::{Message, ServerTransport, ServiceBroker, TransportError};
use rmpv::Value;

use crate::envelope::{
    self, CallParams, ListParams, LoginParams, LogoutParams, RequestEnvelope, ResponseEnvelope,
};
use crate::tracker::RequestTracker;

/// What a single cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The bounded receive elapsed with nothing to deliver.
    Idle,
    /// A message arrived but failed top-level parsing and was dropped.
    Discarded,
    /// A response was shaped and handed to the transport.
    Replied,
}

/// Processes at most one request end to end.
///
/// This is the body of a worker-loop iteration, and also the entry point for
/// single-threaded embeddings that drive the core from their own loop. Every
/// request is handled exactly once; there are no retries at this level.
pub async fn process_next_request(
    transport: &dyn ServerTransport,
    broker: &dyn ServiceBroker,
    tracker: &RequestTracker,
    recv_timeout: Duration,
) -> Result<DispatchOutcome, TransportError> {
    let Some(message) = transport.recv(recv_timeout).await? else {
        return Ok(DispatchOutcome::Idle);
    };

    if log::log_enabled!(log::Level::Debug) {
        log::debug!(
            "rpc: got message from {:08x}: {}",
            message.peer,
            dump(&message.body)
        );
    }

    let Some(request) = RequestEnvelope::parse(&message.body) else {
        // Silently discard: a reply here would echo data back to an
        // unauthenticated peer.
        log::debug!("rpc: could not parse incoming message");
        return Ok(DispatchOutcome::Discarded);
    };

    let peer = message.peer;
    let mut response = ResponseEnvelope::new(request.id.clone());

    match request.method.as_str() {
        "call" => match CallParams::parse(&request.params) {
            Some(params) => {
                let key = format!("{}.{}", params.object, params.method);
                let tracked = tracker.track(&key);
                let status = broker
                    .call(
                        &params.sid,
                        &params.object,
                        &params.method,
                        &params.args,
                        &mut response.body,
                    )
                    .await;
                tracker.untrack(tracked);
                if let Err(err) = status {
                    log::debug!("rpc: call {key} failed: {err}");
                }
            }
            None => {
                log::debug!("rpc: could not parse call message");
                response.body.set_error(envelope::invalid_call_params());
            }
        },
        "list" => {
            // A params mismatch leaves the body empty on purpose: the reply
            // carries neither result nor error. Kept for wire compatibility.
            if let Some(params) = ListParams::parse(&request.params) {
                let listing = broker.list(&params.sid, &params.path).await;
                response.body.set_result(listing);
            }
        }
        "challenge" => {
            response.body.set_result(Value::Map(vec![(
                Value::from("token"),
                Value::from(envelope::challenge_token(peer)),
            )]));
        }
        "login" => {
            let token = envelope::challenge_token(peer);
            match LoginParams::parse(&request.params) {
                Some(params) => {
                    match broker.login(&params.username, &token, &params.response).await {
                        Ok(session) => response.body.set_result(Value::Map(vec![(
                            Value::from("success"),
                            Value::from(session.hash),
                        )])),
                        Err(err) => {
                            log::debug!("rpc: login rejected for {}: {err}", params.username);
                            response.body.set_error(envelope::login_denied());
                        }
                    }
                }
                None => {
                    log::debug!("rpc: could not parse login parameters");
                    response.body.set_error(envelope::login_invalid_params());
                }
            }
        }
        "logout" => {
            let done = match LogoutParams::parse(&request.params) {
                Some(params) => broker.logout(&params.sid).await.is_ok(),
                None => false,
            };
            if done {
                response.body.set_result(Value::Map(vec![(
                    Value::from("success"),
                    Value::from("VALID"),
                )]));
            } else {
                response.body.set_error(envelope::logout_failed());
            }
        }
        _ => response.body.set_error(envelope::invalid_method()),
    }

    let reply = Message::with_body(peer, response.into_value());
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("rpc: sending back: {}", dump(&reply.body));
    }
    transport.send(reply).await?;
    Ok(DispatchOutcome::Replied)
}

fn dump(value: &Value) -> String {
    // Values with non-string map keys are not representable as JSON; fall
    // back to the msgpack value's own rendering.
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
