use serde::{Deserialize, Serialize};

/// Errors reported by a [`crate::ServerTransport`].
///
/// A worker treats every variant as non-fatal: the failed iteration ends and
/// the worker loops again. Only the transport itself decides whether it can
/// keep producing messages.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("i/o failure: {message}")]
    Io { message: String },

    #[error("undecodable frame: {message}")]
    Codec { message: String },
}

impl TransportError {
    /// Convenience constructor for `Io`.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Convenience constructor for `Codec`.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}

/// Errors returned by [`crate::ServiceBroker`] operations.
///
/// `NotImplemented` lets a broker grow method by method: stub everything
/// first, then swap each stub for real logic. The dispatch core maps broker
/// failures onto wire error shapes and never inspects the variant beyond
/// logging.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BrokerError {
    #[error("not implemented: {method}")]
    NotImplemented { method: String },

    #[error("access denied")]
    AccessDenied,

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("rejected: {reason}")]
    Rejected { reason: String },

    #[error("unavailable: {reason}")]
    Unavailable { reason: String },
}

impl BrokerError {
    /// Convenience constructor for `NotImplemented`.
    pub fn not_implemented(method: impl Into<String>) -> Self {
        Self::NotImplemented {
            method: method.into(),
        }
    }
}
