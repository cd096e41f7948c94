//! SRv6 path tracing interface messages (`sr_pt.api`)

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{InterfaceIndex, Message, MessageDef, MessageType, Result, codec::WireReader};

/// Enable path tracing on an interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrPtIfaceAdd {
    pub sw_if_index: InterfaceIndex,
    pub id: u16,
    pub ingress_load: u8,
    pub egress_load: u8,
    pub tts_template: u8,
}

impl Message for SrPtIfaceAdd {
    const NAME: &'static str = "sr_pt_iface_add";
    const CRC: &'static str = "852c0cda";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sw_if_index.0);
        buf.put_u16(self.id);
        buf.put_u8(self.ingress_load);
        buf.put_u8(self.egress_load);
        buf.put_u8(self.tts_template);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sw_if_index: InterfaceIndex(reader.u32()?),
            id: reader.u16()?,
            ingress_load: reader.u8()?,
            egress_load: reader.u8()?,
            tts_template: reader.u8()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrPtIfaceAddReply {
    pub retval: i32,
}

impl Message for SrPtIfaceAddReply {
    const NAME: &'static str = "sr_pt_iface_add_reply";
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

/// Disable path tracing on an interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrPtIfaceDel {
    pub sw_if_index: InterfaceIndex,
}

impl Message for SrPtIfaceDel {
    const NAME: &'static str = "sr_pt_iface_del";
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
pub struct SrPtIfaceDelReply {
    pub retval: i32,
}

impl Message for SrPtIfaceDelReply {
    const NAME: &'static str = "sr_pt_iface_del_reply";
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
pub struct SrPtIfaceDump {}

impl Message for SrPtIfaceDump {
    const NAME: &'static str = "sr_pt_iface_dump";
    const CRC: &'static str = "51077d14";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, _buf: &mut BytesMut) {}

    fn decode_fields(_reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {})
    }
}

/// One path tracing interface, as returned by [`SrPtIfaceDump`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrPtIfaceDetails {
    pub sw_if_index: InterfaceIndex,
    pub id: u16,
    pub ingress_load: u8,
    pub egress_load: u8,
    pub tts_template: u8,
}

impl Message for SrPtIfaceDetails {
    const NAME: &'static str = "sr_pt_iface_details";
    const CRC: &'static str = "1f472f85";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sw_if_index.0);
        buf.put_u16(self.id);
        buf.put_u8(self.ingress_load);
        buf.put_u8(self.egress_load);
        buf.put_u8(self.tts_template);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sw_if_index: InterfaceIndex(reader.u32()?),
            id: reader.u16()?,
            ingress_load: reader.u8()?,
            egress_load: reader.u8()?,
            tts_template: reader.u8()?,
        })
    }
}

#[must_use]
pub fn all_messages() -> Vec<MessageDef> {
    vec![
        MessageDef::of::<SrPtIfaceAdd>(),
        MessageDef::of::<SrPtIfaceAddReply>(),
        MessageDef::of::<SrPtIfaceDel>(),
        MessageDef::of::<SrPtIfaceDelReply>(),
        MessageDef::of::<SrPtIfaceDump>(),
        MessageDef::of::<SrPtIfaceDetails>(),
    ]
}
