//! The receiving endpoint: consumes peer segments, produces acks.
//!
//! The receiver learns the peer's ISN from the first segment carrying SYN;
//! until then everything else is dropped. Each accepted segment is
//! translated from wire sequence space to a stream index and handed to the
//! reassembler. `send` derives the cumulative ack (counting the SYN, and
//! the FIN once the stream closes) and the advertised window.

use crate::byte_stream::{ByteStream, Reader};
use crate::message::{ReceiverMessage, SenderMessage};
use crate::reassembler::Reassembler;
use crate::wrap32::Wrap32;

/// TCP receiver state machine over an owned [`Reassembler`].
#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,
    /// The peer's ISN, learned on the first SYN.
    zero_point: Option<Wrap32>,
}

impl TcpReceiver {
    /// Construct a receiver feeding the given reassembler.
    pub fn new(reassembler: Reassembler) -> Self {
        Self {
            reassembler,
            zero_point: None,
        }
    }

    /// Process one segment from the peer.
    pub fn receive(&mut self, msg: SenderMessage) {
        if self.reassembler.output().has_error() {
            return;
        }
        if msg.rst {
            self.reassembler.set_error();
            return;
        }

        let zero_point = match self.zero_point {
            Some(zero) => zero,
            None => {
                if !msg.syn {
                    return; // nothing is acceptable before the SYN
                }
                self.zero_point = Some(msg.seqno);
                msg.seqno
            }
        };

        // The next byte the reassembler wants, in absolute sequence space
        // (the SYN occupies absolute seqno 0).
        let checkpoint = self.reassembler.output().bytes_pushed() + 1;
        let absolute = msg.seqno.unwrap(zero_point, checkpoint);

        // Stream index excludes the SYN. A bare segment claiming absolute
        // seqno 0 wraps to a huge index and is dropped by the window check.
        let stream_index = (absolute + u64::from(msg.syn)).wrapping_sub(1);
        self.reassembler.insert(stream_index, msg.payload, msg.fin);
    }

    /// The ack and window to report to the peer.
    pub fn send(&self) -> ReceiverMessage {
        let output = self.reassembler.output();
        let window_size = output.available_capacity().min(u64::from(u16::MAX)) as u16;
        let ackno = self.zero_point.map(|zero| {
            let ack_abs =
                output.bytes_pushed() + 1 + u64::from(output.is_closed());
            Wrap32::wrap(ack_abs, zero)
        });
        ReceiverMessage {
            ackno,
            window_size,
            rst: output.has_error(),
        }
    }

    /// Bytes buffered in the reassembler awaiting earlier gaps.
    pub fn bytes_pending(&self) -> u64 {
        self.reassembler.bytes_pending()
    }

    /// Query surface of the reassembled stream.
    pub fn output(&self) -> &ByteStream {
        self.reassembler.output()
    }

    /// Reader handle over the reassembled stream.
    pub fn reader(&mut self) -> Reader<'_> {
        self.reassembler.reader()
    }
}
