//! Message trait and descriptors

use std::fmt::{Debug, Display, Formatter};

use bytes::BytesMut;
use serde::Serialize;

use crate::{Result, codec::WireReader};

/// Kind of a message, which decides the header fields it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageType {
    /// Sent by a client: `msg_id`, `client_index`, `context`
    Request,
    /// Sent in answer to a request: `msg_id`, `context`
    Reply,
    /// Unsolicited notification: `msg_id`, `client_index`
    Event,
    /// Anything else: `msg_id` only
    Other,
}

impl MessageType {
    /// Length of the header that precedes the message fields
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            Self::Request => 10,
            Self::Reply | Self::Event => 6,
            Self::Other => 2,
        }
    }
}

/// A binary API message
///
/// Implementors only describe their own fields; the header is written and
/// skipped by [`crate::codec`] according to [`Message::TYPE`].
pub trait Message: Debug + Send + Sync + Sized + 'static {
    /// Message name as registered by the forwarding plane
    const NAME: &'static str;
    /// CRC of the message definition
    const CRC: &'static str;
    /// Kind of the message
    const TYPE: MessageType;

    /// Append the message fields to `buf`
    fn encode_fields(&self, buf: &mut BytesMut);

    /// Read the message fields from `reader`
    ///
    /// # Errors
    ///
    /// Returns an error if the body is truncated or malformed
    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self>;

    /// Return value carried by replies
    fn retval(&self) -> Option<i32> {
        None
    }

    /// Key under which the message is listed in the message table
    fn name_crc() -> String {
        format!("{}_{}", Self::NAME, Self::CRC)
    }
}

/// Static description of a message, used to check compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MessageDef {
    pub name: &'static str,
    pub crc: &'static str,
    pub kind: MessageType,
}

impl MessageDef {
    /// Describe message `M`
    #[must_use]
    pub const fn of<M: Message>() -> Self {
        Self {
            name: M::NAME,
            crc: M::CRC,
            kind: M::TYPE,
        }
    }

    /// Key under which the message is listed in the message table
    #[must_use]
    pub fn name_crc(&self) -> String {
        format!("{}_{}", self.name, self.crc)
    }
}

impl Display for MessageDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.name, self.crc)
    }
}
