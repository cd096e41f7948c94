//! Software interface messages (`interface.api`)

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{
    IfStatusFlags, InterfaceIndex, MacAddress, Message, MessageDef, MessageType, Result,
    codec::{WireReader, put_fixed_string},
};

const INTERFACE_NAME_LEN: usize = 64;

/// Create a loopback interface; an all-zero MAC lets the forwarding plane
/// pick one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoopback {
    pub mac_address: MacAddress,
}

impl Message for CreateLoopback {
    const NAME: &'static str = "create_loopback";
    const CRC: &'static str = "42bb5d22";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.mac_address.0);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            mac_address: MacAddress(reader.array()?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoopbackReply {
    pub retval: i32,
    pub sw_if_index: InterfaceIndex,
}

impl Message for CreateLoopbackReply {
    const NAME: &'static str = "create_loopback_reply";
    const CRC: &'static str = "5383d31f";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.retval);
        buf.put_u32(self.sw_if_index.0);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            retval: reader.i32()?,
            sw_if_index: InterfaceIndex(reader.u32()?),
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.retval)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteLoopback {
    pub sw_if_index: InterfaceIndex,
}

impl Message for DeleteLoopback {
    const NAME: &'static str = "delete_loopback";
    const CRC: &'static str = "f9e6675e";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sw_if_index.0);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sw_if_index: InterfaceIndex(reader.u32()?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteLoopbackReply {
    pub retval: i32,
}

impl Message for DeleteLoopbackReply {
    const NAME: &'static str = "delete_loopback_reply";
    const CRC: &'static str = "e8d4e804";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.retval);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            retval: reader.i32()?,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.retval)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwInterfaceSetFlags {
    pub sw_if_index: InterfaceIndex,
    pub flags: IfStatusFlags,
}

impl Message for SwInterfaceSetFlags {
    const NAME: &'static str = "sw_interface_set_flags";
    const CRC: &'static str = "f5aec1b8";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sw_if_index.0);
        buf.put_u32(self.flags.0);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sw_if_index: InterfaceIndex(reader.u32()?),
            flags: IfStatusFlags(reader.u32()?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwInterfaceSetFlagsReply {
    pub retval: i32,
}

impl Message for SwInterfaceSetFlagsReply {
    const NAME: &'static str = "sw_interface_set_flags_reply";
    const CRC: &'static str = "e8d4e804";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.retval);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            retval: reader.i32()?,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.retval)
    }
}

/// Dump interfaces; [`InterfaceIndex::ANY`] selects all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwInterfaceDump {
    pub sw_if_index: InterfaceIndex,
}

impl Default for SwInterfaceDump {
    fn default() -> Self {
        Self {
            sw_if_index: InterfaceIndex::ANY,
        }
    }
}

impl Message for SwInterfaceDump {
    const NAME: &'static str = "sw_interface_dump";
    const CRC: &'static str = "f9e6675e";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sw_if_index.0);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sw_if_index: InterfaceIndex(reader.u32()?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwInterfaceDetails {
    pub sw_if_index: InterfaceIndex,
    pub sup_sw_if_index: InterfaceIndex,
    pub l2_address: MacAddress,
    pub flags: IfStatusFlags,
    pub interface_name: String,
}

impl Message for SwInterfaceDetails {
    const NAME: &'static str = "sw_interface_details";
    const CRC: &'static str = "6c221fc7";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sw_if_index.0);
        buf.put_u32(self.sup_sw_if_index.0);
        buf.put_slice(&self.l2_address.0);
        buf.put_u32(self.flags.0);
        put_fixed_string(buf, &self.interface_name, INTERFACE_NAME_LEN);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sw_if_index: InterfaceIndex(reader.u32()?),
            sup_sw_if_index: InterfaceIndex(reader.u32()?),
            l2_address: MacAddress(reader.array()?),
            flags: IfStatusFlags(reader.u32()?),
            interface_name: reader.fixed_string(INTERFACE_NAME_LEN)?,
        })
    }
}

#[must_use]
pub fn all_messages() -> Vec<MessageDef> {
    vec![
        MessageDef::of::<CreateLoopback>(),
        MessageDef::of::<CreateLoopbackReply>(),
        MessageDef::of::<DeleteLoopback>(),
        MessageDef::of::<DeleteLoopbackReply>(),
        MessageDef::of::<SwInterfaceSetFlags>(),
        MessageDef::of::<SwInterfaceSetFlagsReply>(),
        MessageDef::of::<SwInterfaceDump>(),
        MessageDef::of::<SwInterfaceDetails>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_message, encode_message};

    #[test]
    fn interface_details_layout() {
        let details = SwInterfaceDetails {
            sw_if_index: InterfaceIndex(1),
            sup_sw_if_index: InterfaceIndex(1),
            l2_address: MacAddress([2, 0xfe, 0, 0, 0, 1]),
            flags: IfStatusFlags::ADMIN_UP,
            interface_name: "loop0".to_string(),
        };
        let data = encode_message(&details, 30, 0, 9);
        assert_eq!(data.len(), 6 + 4 + 4 + 6 + 4 + 64);
        assert_eq!(decode_message::<SwInterfaceDetails>(&data).unwrap(), details);
    }

    #[test]
    fn loopback_reply_json() {
        let reply = CreateLoopbackReply {
            retval: 0,
            sw_if_index: InterfaceIndex(3),
        };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"retval":0,"sw_if_index":3}"#
        );
    }
}
