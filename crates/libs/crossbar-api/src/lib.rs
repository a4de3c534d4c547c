//! Interface boundary traits for the crossbar dispatch core.
//!
//! This crate defines the contract between the request-processing engine
//! (`crossbar-rpc`) and its collaborators. It provides:
//!
//! - **`Message`** — the request/response container exchanged with a transport
//! - **`ServerTransport`** — bounded-wait receive and fire-and-forget send
//! - **`ServiceBroker`** — the business-logic seam (`call`, `list`, `login`,
//!   `logout`)
//! - **`StubBroker`** — rejects every operation, for stub-first wiring
//! - **`TransportError`** / **`BrokerError`** — typed failures at each seam
//!
//! The dispatch core owns no business logic: session validation, object
//! registries, and credential checks all live behind [`ServiceBroker`].

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BrokerError, TransportError};
pub use traits::{ServerTransport, ServiceBroker};
pub use types::{Message, ResponseBody, SessionId};

mod stub;
pub use stub::StubBroker;
