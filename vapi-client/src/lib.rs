//! Client for the VPP binary API socket
//!
//! This crate provides:
//! - [`adapter`]: the transport seam and the unix socket implementation
//! - [`Connection`]: asynchronous connect with a reconnect policy, a stream
//!   of [`ConnectionEvent`]s and a periodic health check
//! - [`Channel`]: request/reply and dump (multi-reply) calls, plus the
//!   message compatibility check
//!
//! Message definitions and the wire codec live in `vapi-binapi`.

pub mod adapter;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;

pub use adapter::{Adapter, SocketClient};
pub use channel::{Channel, MultiRequestCtx, RequestCtx};
pub use config::{ConnectionConfig, HealthCheckConfig};
pub use connection::{Connection, ConnectionEvent, ConnectionState};
pub use error::{ClientError, Result};

/// Default path of the binary API socket
pub const DEFAULT_SOCKET: &str = "/run/vpp/api.sock";
