use std::path::PathBuf;

use thiserror::Error;
use vapi_binapi::CodecError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Codec(#[from] CodecError),

    /// Another process is serving on the socket
    #[error("Socket already in use by a running instance: {}", .0.display())]
    SocketInUse(PathBuf),

    /// A message arrived before the client registered
    #[error("Message id {0} received before registration")]
    NotRegistered(u16),
}

pub type Result<T> = std::result::Result<T, SimError>;
