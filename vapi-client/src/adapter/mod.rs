//! Transport seam between connections and the forwarding plane

mod socket;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub use socket::SocketClient;

use crate::Result;

/// Callback invoked by the adapter for every incoming message
///
/// Receives the message id and the full message body, header included.
pub type MsgCallback = Arc<dyn Fn(u16, Bytes) + Send + Sync>;

/// A raw message transport to the forwarding plane
///
/// Implement this trait to plug in a transport other than the API socket.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Connect, register the client and start delivering incoming messages
    /// to `on_message`
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened or registration
    /// fails
    async fn connect(&self, on_message: MsgCallback) -> Result<()>;

    /// Deregister and close the transport; a no-op when not connected
    ///
    /// # Errors
    ///
    /// Returns an error if deregistration could not be sent
    async fn disconnect(&self) -> Result<()>;

    /// Id assigned to `name_crc` by the forwarding plane
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::UnknownMessage`] if the message is not
    /// in the message table
    fn message_id(&self, name_crc: &str) -> Result<u16>;

    /// Index assigned to this client at registration
    fn client_index(&self) -> u32;

    /// Send one encoded message
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is not connected or the write fails
    async fn send_msg(&self, data: Bytes) -> Result<()>;

    fn is_connected(&self) -> bool;
}
