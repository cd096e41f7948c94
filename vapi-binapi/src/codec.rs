//! Wire encoding of message bodies
//!
//! All integers are big endian and fields are packed without padding.
//! Fixed-size strings are NUL padded to their declared length.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{CodecError, Message, MessageType, Result};

/// Encode `msg` with its header
///
/// `client_index` is only written for requests and events, `context` only
/// for requests and replies.
pub fn encode_message<M: Message>(msg: &M, msg_id: u16, client_index: u32, context: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u16(msg_id);
    match M::TYPE {
        MessageType::Request => {
            buf.put_u32(client_index);
            buf.put_u32(context);
        }
        MessageType::Reply => buf.put_u32(context),
        MessageType::Event => buf.put_u32(client_index),
        MessageType::Other => {}
    }
    msg.encode_fields(&mut buf);
    buf.freeze()
}

/// Decode a message body, skipping the header for `M`'s kind
///
/// # Errors
///
/// Returns an error if the body is truncated or malformed
pub fn decode_message<M: Message>(data: &[u8]) -> Result<M> {
    let mut reader = WireReader::new(data);
    reader.skip(M::TYPE.header_len())?;
    M::decode_fields(&mut reader)
}

/// Read the message id without decoding the rest
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] for bodies shorter than two bytes
pub fn peek_msg_id(data: &[u8]) -> Result<u16> {
    WireReader::new(data).u16()
}

/// Read the context of a message of the given kind
///
/// Events and other messages carry no context and yield `0`.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] when the header is incomplete
pub fn peek_context(data: &[u8], kind: MessageType) -> Result<u32> {
    let mut reader = WireReader::new(data);
    match kind {
        MessageType::Request => {
            reader.skip(6)?;
            reader.u32()
        }
        MessageType::Reply => {
            reader.skip(2)?;
            reader.u32()
        }
        MessageType::Event | MessageType::Other => Ok(0),
    }
}

/// Write `value` into a fixed field of `len` bytes, keeping a trailing NUL
pub fn put_fixed_string(buf: &mut BytesMut, value: &str, len: usize) {
    let mut take = value.len().min(len.saturating_sub(1));
    while !value.is_char_boundary(take) {
        take -= 1;
    }
    buf.put_slice(&value.as_bytes()[..take]);
    buf.put_bytes(0, len - take);
}

/// Bounds-checked reader over a message body
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(CodecError::Truncated {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.buf.advance(len);
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read a NUL padded string field of `len` bytes
    pub fn fixed_string(&mut self, len: usize) -> Result<String> {
        self.ensure(len)?;
        let (field, rest) = self.buf.split_at(len);
        self.buf = rest;
        let end = field.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(String::from_utf8(field[..end].to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        InterfaceIndex,
        memclnt::ControlPingReply,
        sr_pt::{SrPtIfaceAdd, SrPtIfaceDetails},
    };

    #[test]
    fn request_header_and_fields_are_big_endian() {
        let msg = SrPtIfaceAdd {
            sw_if_index: InterfaceIndex(5),
            id: 400,
            ingress_load: 1,
            egress_load: 1,
            tts_template: 2,
        };
        let data = encode_message(&msg, 0x0120, 7, 0x0001_0003);
        assert_eq!(
            data.as_ref(),
            &[
                0x01, 0x20, // msg_id
                0, 0, 0, 7, // client_index
                0, 1, 0, 3, // context
                0, 0, 0, 5, // sw_if_index
                0x01, 0x90, // id
                1, 1, 2, // loads and template
            ]
        );
        assert_eq!(peek_msg_id(&data), Ok(0x0120));
        assert_eq!(peek_context(&data, MessageType::Request), Ok(0x0001_0003));
        assert_eq!(decode_message::<SrPtIfaceAdd>(&data), Ok(msg));
    }

    #[test]
    fn reply_header_has_no_client_index() {
        let reply = ControlPingReply {
            retval: 0,
            client_index: 3,
            vpe_pid: 99,
        };
        let data = encode_message(&reply, 20, 1234, 0xdead);
        assert_eq!(data.len(), 6 + 12);
        assert_eq!(peek_context(&data, MessageType::Reply), Ok(0xdead));
    }

    #[test]
    fn truncated_body_is_an_error() {
        let details = SrPtIfaceDetails {
            sw_if_index: InterfaceIndex(1),
            id: 2,
            ingress_load: 3,
            egress_load: 4,
            tts_template: 5,
        };
        let data = encode_message(&details, 42, 0, 1);
        let short = &data[..data.len() - 1];
        assert_eq!(
            decode_message::<SrPtIfaceDetails>(short),
            Err(CodecError::Truncated {
                needed: 1,
                remaining: 0
            })
        );
        assert!(peek_msg_id(&[0x01]).is_err());
    }

    #[test]
    fn fixed_strings_are_padded_and_trimmed() {
        let mut buf = BytesMut::new();
        put_fixed_string(&mut buf, "loop0", 8);
        assert_eq!(buf.as_ref(), b"loop0\0\0\0");

        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.fixed_string(8).unwrap(), "loop0");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn long_strings_keep_a_terminator() {
        let mut buf = BytesMut::new();
        put_fixed_string(&mut buf, "abcdef", 4);
        assert_eq!(buf.as_ref(), b"abc\0");
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let mut buf = BytesMut::new();
        put_fixed_string(&mut buf, "abé", 4);
        assert_eq!(buf.as_ref(), b"ab\0\0");
        assert_eq!(WireReader::new(&buf).fixed_string(4).unwrap(), "ab");

        let mut buf = BytesMut::new();
        let name = format!("{}é", "x".repeat(62));
        put_fixed_string(&mut buf, &name, 64);
        assert_eq!(buf.len(), 64);
        assert_eq!(WireReader::new(&buf).fixed_string(64).unwrap(), "x".repeat(62));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut reader = WireReader::new(&[0xff, 0xfe, 0, 0]);
        assert!(matches!(
            reader.fixed_string(4),
            Err(CodecError::InvalidString(_))
        ));
    }
}
