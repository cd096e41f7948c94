//! Client registration and keepalive messages (`memclnt.api`)

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{
    CodecError, Message, MessageDef, MessageType, Result,
    codec::{WireReader, put_fixed_string},
};

/// Message id reserved for `sockclnt_create` on the API socket
///
/// The message table is only known after registration, so the first
/// exchange uses fixed ids.
pub const SOCKCLNT_CREATE_MSG_ID: u16 = 15;

/// Message id reserved for `sockclnt_create_reply`
pub const SOCKCLNT_CREATE_REPLY_MSG_ID: u16 = 16;

const CLIENT_NAME_LEN: usize = 64;
const TABLE_NAME_LEN: usize = 64;

/// Register a client over the API socket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockclntCreate {
    pub name: String,
}

impl Message for SockclntCreate {
    const NAME: &'static str = "sockclnt_create";
    const CRC: &'static str = "455fb9c4";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        put_fixed_string(buf, &self.name, CLIENT_NAME_LEN);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            name: reader.fixed_string(CLIENT_NAME_LEN)?,
        })
    }
}

/// One entry of the message table returned at registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTableEntry {
    pub index: u16,
    pub name: String,
}

/// Registration result and the message table of the forwarding plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockclntCreateReply {
    pub response: i32,
    pub index: u32,
    pub count: u16,
    pub message_table: Vec<MessageTableEntry>,
}

impl SockclntCreateReply {
    /// Build a reply whose `count` matches the table
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ArrayTooLong`] when the table has more entries
    /// than a `u16` can count
    pub fn new(response: i32, index: u32, message_table: Vec<MessageTableEntry>) -> Result<Self> {
        let count = u16::try_from(message_table.len())
            .map_err(|_| CodecError::ArrayTooLong(message_table.len()))?;
        Ok(Self {
            response,
            index,
            count,
            message_table,
        })
    }
}

impl Message for SockclntCreateReply {
    const NAME: &'static str = "sockclnt_create_reply";
    const CRC: &'static str = "35166268";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.response);
        buf.put_u32(self.index);
        buf.put_u16(self.count);
        for entry in &self.message_table {
            buf.put_u16(entry.index);
            put_fixed_string(buf, &entry.name, TABLE_NAME_LEN);
        }
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        let response = reader.i32()?;
        let index = reader.u32()?;
        let count = reader.u16()?;
        let mut message_table = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            message_table.push(MessageTableEntry {
                index: reader.u16()?,
                name: reader.fixed_string(TABLE_NAME_LEN)?,
            });
        }
        Ok(Self {
            response,
            index,
            count,
            message_table,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.response)
    }
}

/// Deregister a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockclntDelete {
    pub index: u32,
}

impl Message for SockclntDelete {
    const NAME: &'static str = "sockclnt_delete";
    const CRC: &'static str = "8ac76db6";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.index);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            index: reader.u32()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockclntDeleteReply {
    pub response: i32,
}

impl Message for SockclntDeleteReply {
    const NAME: &'static str = "sockclnt_delete_reply";
    const CRC: &'static str = "8f38b1ee";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.response);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            response: reader.i32()?,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.response)
    }
}

/// Keepalive, also used to terminate multi-part replies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPing {}

impl Message for ControlPing {
    const NAME: &'static str = "control_ping";
    const CRC: &'static str = "51077d14";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, _buf: &mut BytesMut) {}

    fn decode_fields(_reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPingReply {
    pub retval: i32,
    pub client_index: u32,
    pub vpe_pid: u32,
}

impl Message for ControlPingReply {
    const NAME: &'static str = "control_ping_reply";
    const CRC: &'static str = "f6b0b8ca";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.retval);
        buf.put_u32(self.client_index);
        buf.put_u32(self.vpe_pid);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            retval: reader.i32()?,
            client_index: reader.u32()?,
            vpe_pid: reader.u32()?,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.retval)
    }
}

#[must_use]
pub fn all_messages() -> Vec<MessageDef> {
    vec![
        MessageDef::of::<SockclntCreate>(),
        MessageDef::of::<SockclntCreateReply>(),
        MessageDef::of::<SockclntDelete>(),
        MessageDef::of::<SockclntDeleteReply>(),
        MessageDef::of::<ControlPing>(),
        MessageDef::of::<ControlPingReply>(),
    ]
}
