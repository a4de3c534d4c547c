//! Concurrent dispatch core of the crossbar RPC backend.
//!
//! The engine pulls structured call envelopes from a [`ServerTransport`],
//! routes them to a [`ServiceBroker`], and ships shaped responses back. It
//! provides:
//!
//! - **Envelope parsing & response shaping** ([`envelope`]) — the five-method
//!   protocol surface with its exact failure policies
//! - **[`RequestTracker`]** ([`tracker`]) — lock-guarded records of in-flight
//!   `call` invocations, removed by insertion identity
//! - **Hang monitor** ([`monitor`]) — periodic scan that flags calls past
//!   their deadline without ever cancelling them
//! - **[`RpcServer`]** ([`server`]) — the permit-gated worker pool
//!
//! A malformed top-level envelope is dropped without any reply; per-method
//! parameter mismatches answer with method-specific error shapes. Both
//! policies are part of the wire contract and covered by the integration
//! suite.
//!
//! [`ServerTransport`]: crossbar_api::ServerTransport
//! [`ServiceBroker`]: crossbar_api::ServiceBroker

pub mod dispatch;
pub mod envelope;
pub mod monitor;
pub mod server;
pub mod tracker;

pub use dispatch::{process_next_request, DispatchOutcome};
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use monitor::{spawn_hang_monitor, MONITOR_INTERVAL};
pub use server::{RpcConfig, RpcServer};
pub use tracker::{RequestTracker, TrackedCall, WORKER_TIMEOUT};
