//! Error types for client operations

use std::time::Duration;

use thiserror::Error;
use vapi_binapi::{ApiError, CodecError};

/// Errors that can occur while talking to the forwarding plane
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error on the API socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be decoded
    #[error("Protocol error: {0}")]
    Codec(#[from] CodecError),

    /// The forwarding plane answered with a non-zero retval
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Client registration was refused or malformed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The adapter is not connected
    #[error("Not connected")]
    NotConnected,

    /// The connection went away while waiting for a reply
    #[error("Connection closed")]
    ConnectionClosed,

    /// No reply arrived in time
    #[error("No reply received within {0:?}")]
    Timeout(Duration),

    /// The message is not in the forwarding plane's message table
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    /// Some messages required by the caller are not supported
    #[error("Incompatible messages: {}", .missing.join(", "))]
    Incompatible { missing: Vec<String> },

    /// A reply of the wrong type arrived for a request
    #[error("Unexpected reply: expected {expected}, received message id {received}")]
    UnexpectedReply { expected: String, received: u16 },

    /// A reply arrived for a request that has not been sent yet
    #[error("Reply sequence {received} is ahead of request {expected}")]
    InvalidSequence { expected: u16, received: u16 },

    /// Every channel id is in use
    #[error("No free channel id")]
    ChannelsExhausted,

    /// The configuration cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
