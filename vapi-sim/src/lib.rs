//! A small stand-in for the forwarding plane's binary API socket
//!
//! [`SimServer`] speaks the same framing, registration handshake and message
//! encoding as the real socket, and keeps just enough in-memory state
//! ([`state::Dataplane`]) to answer the loopback, interface and path tracing
//! requests. Behaviour can be bent per test through [`SimConfig`]: hide
//! messages from the message table, force a retval for a request, or seed
//! path tracing records.

pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod state;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use server::{SimHandle, SimServer, SimStats};
