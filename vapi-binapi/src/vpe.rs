//! General forwarding-plane messages (`vpe.api`)

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{
    Message, MessageDef, MessageType, Result,
    codec::{WireReader, put_fixed_string},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowVersion {}

impl Message for ShowVersion {
    const NAME: &'static str = "show_version";
    const CRC: &'static str = "51077d14";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, _buf: &mut BytesMut) {}

    fn decode_fields(_reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowVersionReply {
    pub retval: i32,
    pub program: String,
    pub version: String,
    pub build_date: String,
    pub build_directory: String,
}

impl Message for ShowVersionReply {
    const NAME: &'static str = "show_version_reply";
    const CRC: &'static str = "c919bde1";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.retval);
        put_fixed_string(buf, &self.program, 32);
        put_fixed_string(buf, &self.version, 32);
        put_fixed_string(buf, &self.build_date, 32);
        put_fixed_string(buf, &self.build_directory, 256);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            retval: reader.i32()?,
            program: reader.fixed_string(32)?,
            version: reader.fixed_string(32)?,
            build_date: reader.fixed_string(32)?,
            build_directory: reader.fixed_string(256)?,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.retval)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowVpeSystemTime {}

impl Message for ShowVpeSystemTime {
    const NAME: &'static str = "show_vpe_system_time";
    const CRC: &'static str = "51077d14";
    const TYPE: MessageType = MessageType::Request;

    fn encode_fields(&self, _buf: &mut BytesMut) {}

    fn decode_fields(_reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowVpeSystemTimeReply {
    pub retval: i32,
    /// Seconds since the Unix epoch
    pub vpe_system_time: f64,
}

impl Message for ShowVpeSystemTimeReply {
    const NAME: &'static str = "show_vpe_system_time_reply";
    const CRC: &'static str = "7ffd8193";
    const TYPE: MessageType = MessageType::Reply;

    fn encode_fields(&self, buf: &mut BytesMut) {
        buf.put_i32(self.retval);
        buf.put_f64(self.vpe_system_time);
    }

    fn decode_fields(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            retval: reader.i32()?,
            vpe_system_time: reader.f64()?,
        })
    }

    fn retval(&self) -> Option<i32> {
        Some(self.retval)
    }
}

#[must_use]
pub fn all_messages() -> Vec<MessageDef> {
    vec![
        MessageDef::of::<ShowVersion>(),
        MessageDef::of::<ShowVersionReply>(),
        MessageDef::of::<ShowVpeSystemTime>(),
        MessageDef::of::<ShowVpeSystemTimeReply>(),
    ]
}
