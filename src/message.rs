//! Wire messages exchanged between the two endpoints.
//!
//! A [`SenderMessage`] carries a segment of the byte stream plus the SYN /
//! FIN / RST flags; a [`ReceiverMessage`] carries the cumulative ack and the
//! advertised window. Both encode to a compact big-endian layout:
//!
//! ```text
//! sender:   seqno(4) | flags(1) | payload_len(2) | payload(N)
//! receiver: flags(1) | ackno(4, present iff ACK flag) | window_size(2)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireStreamError};
use crate::wrap32::Wrap32;

/// Maximum payload bytes carried by a single segment.
pub const MAX_PAYLOAD_SIZE: usize = 1452;

const SENDER_HEADER_LEN: usize = 7;

const FLAG_SYN: u8 = 0x01;
const FLAG_FIN: u8 = 0x02;
const FLAG_RST: u8 = 0x04;
const SENDER_FLAG_MASK: u8 = FLAG_SYN | FLAG_FIN | FLAG_RST;

const FLAG_ACK: u8 = 0x01;
const RECEIVER_FLAG_RST: u8 = 0x02;
const RECEIVER_FLAG_MASK: u8 = FLAG_ACK | RECEIVER_FLAG_RST;

/// A segment from the sender: sequence number, payload, and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderMessage {
    pub seqno: Wrap32,
    pub syn: bool,
    pub payload: Bytes,
    pub fin: bool,
    pub rst: bool,
}

impl SenderMessage {
    /// Sequence space consumed by this segment: SYN and FIN each occupy one
    /// number in addition to the payload bytes.
    pub fn sequence_length(&self) -> u64 {
        u64::from(self.syn) + self.payload.len() as u64 + u64::from(self.fin)
    }

    /// Encode this message into a byte buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into a pre-allocated `BytesMut`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.syn {
            flags |= FLAG_SYN;
        }
        if self.fin {
            flags |= FLAG_FIN;
        }
        if self.rst {
            flags |= FLAG_RST;
        }
        buf.put_u32(self.seqno.raw());
        buf.put_u8(flags);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);
    }

    /// The total number of bytes this message occupies when encoded.
    pub fn encoded_len(&self) -> usize {
        SENDER_HEADER_LEN + self.payload.len()
    }

    /// Decode a message from the given byte buffer.
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, SENDER_HEADER_LEN)?;
        let seqno = Wrap32::new((&data[0..4]).get_u32());
        let flags = data[4];
        if flags & !SENDER_FLAG_MASK != 0 {
            return Err(WireStreamError::UnknownFlags(flags));
        }
        let payload_len = (&data[5..7]).get_u16() as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(WireStreamError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let data = &data[SENDER_HEADER_LEN..];
        ensure_len(data, payload_len)?;
        Ok(Self {
            seqno,
            syn: flags & FLAG_SYN != 0,
            payload: Bytes::copy_from_slice(&data[..payload_len]),
            fin: flags & FLAG_FIN != 0,
            rst: flags & FLAG_RST != 0,
        })
    }
}

/// The receiver's side of the conversation: cumulative ack and window.
///
/// `ackno` is absent until the receiver has seen the peer's SYN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverMessage {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
    pub rst: bool,
}

impl ReceiverMessage {
    /// Encode this message into a byte buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into a pre-allocated `BytesMut`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.ackno.is_some() {
            flags |= FLAG_ACK;
        }
        if self.rst {
            flags |= RECEIVER_FLAG_RST;
        }
        buf.put_u8(flags);
        if let Some(ackno) = self.ackno {
            buf.put_u32(ackno.raw());
        }
        buf.put_u16(self.window_size);
    }

    /// The total number of bytes this message occupies when encoded.
    pub fn encoded_len(&self) -> usize {
        1 + if self.ackno.is_some() { 4 } else { 0 } + 2
    }

    /// Decode a message from the given byte buffer.
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, 1)?;
        let flags = data[0];
        if flags & !RECEIVER_FLAG_MASK != 0 {
            return Err(WireStreamError::UnknownFlags(flags));
        }
        let mut data = &data[1..];
        let ackno = if flags & FLAG_ACK != 0 {
            ensure_len(data, 4)?;
            let raw = (&data[0..4]).get_u32();
            data = &data[4..];
            Some(Wrap32::new(raw))
        } else {
            None
        };
        ensure_len(data, 2)?;
        Ok(Self {
            ackno,
            window_size: (&data[0..2]).get_u16(),
            rst: flags & RECEIVER_FLAG_RST != 0,
        })
    }
}

fn ensure_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        Err(WireStreamError::MessageTooShort {
            expected: needed,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}
