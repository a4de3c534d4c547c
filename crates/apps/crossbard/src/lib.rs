//! Daemon-side wiring for the crossbar dispatch core: TOML configuration,
//! the length-prefixed msgpack frame codec, and a TCP transport implementing
//! the core's `ServerTransport` boundary.

pub mod codec;
pub mod config;
pub mod transport;
