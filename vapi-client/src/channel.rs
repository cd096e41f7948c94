//! Request/reply channels multiplexed over one connection

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, trace, warn};
use vapi_binapi::{
    Message, MessageDef, check_retval,
    codec::{decode_message, encode_message},
    memclnt::{ControlPing, ControlPingReply},
};

use crate::{ClientError, Result, connection::Inner};

const MULTIPART_FLAG: u32 = 1 << 12;
const SEQ_MASK: u16 = 0x0fff;

/// Pack a channel id, multipart flag and sequence number into a context
pub(crate) fn pack_context(channel_id: u16, multipart: bool, seq: u16) -> u32 {
    let mut context = u32::from(channel_id) << 16;
    if multipart {
        context |= MULTIPART_FLAG;
    }
    context | u32::from(seq & SEQ_MASK)
}

/// Split a context into channel id, multipart flag and sequence number
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn unpack_context(context: u32) -> (u16, bool, u16) {
    (
        (context >> 16) as u16,
        context & MULTIPART_FLAG != 0,
        (context as u16) & SEQ_MASK,
    )
}

/// `received` belongs to a request sent before `expected`
const fn is_stale(received: u16, expected: u16) -> bool {
    let distance = expected.wrapping_sub(received) & SEQ_MASK;
    distance != 0 && distance <= SEQ_MASK / 2
}

/// A reply routed to a channel
#[derive(Debug)]
pub(crate) struct ReplyFrame {
    pub msg_id: u16,
    pub context: u32,
    pub data: Bytes,
}

/// A request/reply session on a [`crate::Connection`]
///
/// The channel is registered with its connection until it is closed or
/// dropped.
pub struct Channel {
    id: u16,
    conn: Arc<Inner>,
    replies: mpsc::UnboundedReceiver<ReplyFrame>,
    next_seq: u16,
    reply_timeout: Duration,
}

impl Channel {
    pub(crate) fn open(conn: &Arc<Inner>) -> Result<Self> {
        let (tx, replies) = mpsc::unbounded_channel();
        let id = conn.register_channel(tx)?;
        debug!(channel = id, "Opened channel");
        Ok(Self {
            id,
            conn: Arc::clone(conn),
            replies,
            next_seq: 0,
            reply_timeout: conn.config.reply_timeout(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> u16 {
        self.id
    }

    pub const fn set_reply_timeout(&mut self, timeout: Duration) {
        self.reply_timeout = timeout;
    }

    /// Verify that every message in `messages` is known to the forwarding
    /// plane
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Incompatible`] listing every missing message
    pub fn check_compatibility(&self, messages: &[MessageDef]) -> Result<()> {
        let missing: Vec<String> = messages
            .iter()
            .map(MessageDef::name_crc)
            .filter(|name_crc| self.conn.adapter.message_id(name_crc).is_err())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Incompatible { missing })
        }
    }

    /// Send a request expecting exactly one reply
    ///
    /// # Errors
    ///
    /// Returns an error if the message is unknown or cannot be sent
    pub async fn send_request<M: Message>(&mut self, msg: &M) -> Result<RequestCtx<'_>> {
        let msg_id = self.conn.adapter.message_id(&M::name_crc())?;
        let seq = self.next_seq();
        self.send(msg, msg_id, pack_context(self.id, false, seq)).await?;
        Ok(RequestCtx { channel: self, seq })
    }

    /// Send a dump request, followed by the `control_ping` that marks the
    /// end of its replies
    ///
    /// # Errors
    ///
    /// Returns an error if the message is unknown or cannot be sent
    pub async fn send_multi_request<M: Message>(&mut self, msg: &M) -> Result<MultiRequestCtx<'_>> {
        let adapter = &self.conn.adapter;
        let msg_id = adapter.message_id(&M::name_crc())?;
        let ping_id = adapter.message_id(&ControlPing::name_crc())?;
        let ping_reply_id = adapter.message_id(&ControlPingReply::name_crc())?;

        let seq = self.next_seq();
        let context = pack_context(self.id, true, seq);
        self.send(msg, msg_id, context).await?;
        self.send(&ControlPing {}, ping_id, context).await?;

        Ok(MultiRequestCtx {
            channel: self,
            seq,
            ping_reply_id,
            done: false,
        })
    }

    /// Unregister the channel from its connection
    pub fn close(self) {
        debug!(channel = self.id, "Closing channel");
    }

    const fn next_seq(&mut self) -> u16 {
        self.next_seq = (self.next_seq + 1) & SEQ_MASK;
        self.next_seq
    }

    async fn send<M: Message>(&self, msg: &M, msg_id: u16, context: u32) -> Result<()> {
        let adapter = &self.conn.adapter;
        trace!(channel = self.id, context, message = M::NAME, "Sending request");
        adapter
            .send_msg(encode_message(msg, msg_id, adapter.client_index(), context))
            .await
    }

    async fn receive_frame(&mut self, seq: u16) -> Result<ReplyFrame> {
        loop {
            let frame = timeout(self.reply_timeout, self.replies.recv())
                .await
                .map_err(|_| ClientError::Timeout(self.reply_timeout))?
                .ok_or(ClientError::ConnectionClosed)?;

            let (_, _, received) = unpack_context(frame.context);
            if received == seq {
                return Ok(frame);
            }
            if is_stale(received, seq) {
                warn!(
                    channel = self.id,
                    received,
                    expected = seq,
                    "Ignoring reply to an earlier request"
                );
                continue;
            }
            return Err(ClientError::InvalidSequence {
                expected: seq,
                received,
            });
        }
    }

    fn decode<R: Message>(frame: &ReplyFrame, expected_id: u16) -> Result<R> {
        if frame.msg_id != expected_id {
            return Err(ClientError::UnexpectedReply {
                expected: R::NAME.to_string(),
                received: frame.msg_id,
            });
        }
        let reply: R = decode_message(&frame.data)?;
        if let Some(retval) = reply.retval() {
            check_retval(retval)?;
        }
        Ok(reply)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.conn.unregister_channel(self.id);
    }
}

/// Pending single-reply request
pub struct RequestCtx<'a> {
    channel: &'a mut Channel,
    seq: u16,
}

impl RequestCtx<'_> {
    /// Wait for the reply and decode it as `R`
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, on a reply of another type, or when the
    /// reply carries a non-zero retval
    pub async fn receive_reply<R: Message>(self) -> Result<R> {
        let expected_id = self.channel.conn.adapter.message_id(&R::name_crc())?;
        let frame = self.channel.receive_frame(self.seq).await?;
        Channel::decode(&frame, expected_id)
    }
}

/// Pending dump request
pub struct MultiRequestCtx<'a> {
    channel: &'a mut Channel,
    seq: u16,
    ping_reply_id: u16,
    done: bool,
}

impl MultiRequestCtx<'_> {
    /// Receive the next record, or `None` once the dump is complete
    ///
    /// # Errors
    ///
    /// Returns an error on timeout or on a reply of another type; the dump
    /// should be abandoned afterwards
    pub async fn receive_reply<R: Message>(&mut self) -> Result<Option<R>> {
        if self.done {
            return Ok(None);
        }

        let expected_id = self.channel.conn.adapter.message_id(&R::name_crc())?;
        let frame = self.channel.receive_frame(self.seq).await?;

        if frame.msg_id == self.ping_reply_id {
            self.done = true;
            let ping: ControlPingReply = decode_message(&frame.data)?;
            check_retval(ping.retval)?;
            return Ok(None);
        }
        Channel::decode(&frame, expected_id).map(Some)
    }
}
