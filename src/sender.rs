//! The sending endpoint: segmentation, window accounting, retransmission.
//!
//! The sender drains an outbound [`ByteStream`] into wire segments sized to
//! the peer's advertised window, keeps every unacknowledged segment in a
//! FIFO, and retransmits the oldest one when the retransmission timer
//! expires. The timer backs off exponentially on each consecutive
//! retransmission, except while probing a zero window. Segments leave
//! through a caller-supplied `transmit` callback; time advances only through
//! `tick`.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;

use crate::byte_stream::{ByteStream, Writer};
use crate::message::{ReceiverMessage, SenderMessage, MAX_PAYLOAD_SIZE};
use crate::wrap32::Wrap32;

/// Countdown driving retransmission of the oldest outstanding segment.
///
/// The timer holds the current RTO and the milliseconds elapsed since it was
/// last started or reset; the wall clock is delivered externally via `tick`.
#[derive(Debug)]
struct RetransmissionTimer {
    rto_ms: u64,
    elapsed_ms: u64,
    active: bool,
}

impl RetransmissionTimer {
    fn new(initial_rto_ms: u64) -> Self {
        Self {
            rto_ms: initial_rto_ms,
            elapsed_ms: 0,
            active: false,
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_expired(&self) -> bool {
        self.active && self.elapsed_ms >= self.rto_ms
    }

    fn reset(&mut self) {
        self.elapsed_ms = 0;
    }

    fn exponential_backoff(&mut self) {
        self.rto_ms *= 2;
    }

    /// Restore the RTO and restart the countdown.
    fn reload(&mut self, initial_rto_ms: u64) {
        self.rto_ms = initial_rto_ms;
        self.reset();
    }

    fn start(&mut self) {
        self.active = true;
        self.reset();
    }

    fn stop(&mut self) {
        self.active = false;
        self.reset();
    }

    fn tick(&mut self, ms_since_last_tick: u64) -> &mut Self {
        if self.active {
            self.elapsed_ms += ms_since_last_tick;
        }
        self
    }
}

/// High-level sender lifecycle, derived from the connection flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Nothing sent yet.
    Closed,
    /// SYN sent, not yet acknowledged.
    SynSent,
    /// SYN acknowledged; stream transfer in progress.
    Established,
    /// FIN sent, not yet acknowledged.
    FinSent,
    /// Everything through the FIN acknowledged.
    FinAcked,
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderState::Closed => write!(f, "Closed"),
            SenderState::SynSent => write!(f, "SynSent"),
            SenderState::Established => write!(f, "Established"),
            SenderState::FinSent => write!(f, "FinSent"),
            SenderState::FinAcked => write!(f, "FinAcked"),
        }
    }
}

/// TCP sender state machine over an owned outbound [`ByteStream`].
///
/// The application writes into the stream through [`TcpSender::writer`];
/// `push` turns buffered bytes into segments.
#[derive(Debug)]
pub struct TcpSender {
    input: ByteStream,
    isn: Wrap32,
    initial_rto_ms: u64,

    timer: RetransmissionTimer,

    syn_sent: bool,
    fin_sent: bool,

    /// Next absolute sequence number to send.
    next_abs_seqno: u64,
    /// Greatest cumulative ack received.
    ack_abs_seqno: u64,
    /// Last advertised window; starts at 1 so the first SYN probes.
    window_size: u16,
    /// Sent, unacknowledged segments in send order.
    outstanding: VecDeque<SenderMessage>,

    /// Sum of `sequence_length` over `outstanding`.
    total_outstanding: u64,
    /// Consecutive retransmissions since the last acknowledged progress.
    total_retransmission: u64,
}

impl TcpSender {
    /// Construct a sender with the given ISN and initial RTO.
    pub fn new(input: ByteStream, isn: Wrap32, initial_rto_ms: u64) -> Self {
        Self {
            input,
            isn,
            initial_rto_ms,
            timer: RetransmissionTimer::new(initial_rto_ms),
            syn_sent: false,
            fin_sent: false,
            next_abs_seqno: 0,
            ack_abs_seqno: 0,
            window_size: 1,
            outstanding: VecDeque::new(),
            total_outstanding: 0,
            total_retransmission: 0,
        }
    }

    /// Construct a sender with a randomly chosen ISN.
    pub fn with_random_isn(input: ByteStream, initial_rto_ms: u64) -> Self {
        Self::new(input, Wrap32::random(), initial_rto_ms)
    }

    /// Segment buffered input and transmit as much as the window allows.
    ///
    /// Emits segments in strictly increasing sequence order. The SYN rides
    /// the first segment; the FIN is appended once the input is finished and
    /// the window has room for it.
    pub fn push(&mut self, mut transmit: impl FnMut(&SenderMessage)) {
        while self.effective_window() > self.total_outstanding {
            if self.fin_sent {
                break;
            }

            let mut msg = self.make_empty_message();
            if !self.syn_sent {
                msg.syn = true;
                self.syn_sent = true;
            }

            let remaining = self.effective_window() - self.total_outstanding;
            let limit = (MAX_PAYLOAD_SIZE as u64).min(remaining - msg.sequence_length());
            msg.payload = self.input.reader().read(limit);

            if !self.fin_sent
                && remaining > msg.sequence_length()
                && self.input.is_finished()
            {
                msg.fin = true;
                self.fin_sent = true;
            }

            if msg.sequence_length() == 0 {
                break; // nothing to send this pass
            }

            transmit(&msg);
            if !self.timer.is_active() {
                self.timer.start();
            }
            self.next_abs_seqno += msg.sequence_length();
            self.total_outstanding += msg.sequence_length();
            self.outstanding.push_back(msg);
        }
    }

    /// An empty segment at the current send position, for bare acks or RST.
    pub fn make_empty_message(&self) -> SenderMessage {
        SenderMessage {
            seqno: Wrap32::wrap(self.next_abs_seqno, self.isn),
            syn: false,
            payload: Bytes::new(),
            fin: false,
            rst: self.input.has_error(),
        }
    }

    /// Process an ack/window report from the peer's receiver.
    pub fn receive(&mut self, msg: &ReceiverMessage) {
        if self.input.has_error() {
            return;
        }
        if msg.rst {
            self.input.set_error();
            return;
        }

        self.window_size = msg.window_size;

        let Some(ackno) = msg.ackno else {
            return;
        };
        let recv_ack = ackno.unwrap(self.isn, self.next_abs_seqno);
        if recv_ack > self.next_abs_seqno {
            return; // acks sequence numbers never sent
        }

        let mut progressed = false;
        while let Some(front) = self.outstanding.front() {
            // Segments are retired only when acknowledged in full.
            if self.ack_abs_seqno + front.sequence_length() > recv_ack {
                break;
            }
            progressed = true;
            self.ack_abs_seqno += front.sequence_length();
            self.total_outstanding -= front.sequence_length();
            self.outstanding.pop_front();
        }

        if progressed {
            self.total_retransmission = 0;
            self.timer.reload(self.initial_rto_ms);
            if self.outstanding.is_empty() {
                self.timer.stop();
            } else {
                self.timer.start();
            }
        }
    }

    /// Advance the clock; retransmit the oldest segment if the RTO expired.
    ///
    /// At most one retransmission per call. Retransmissions while the peer
    /// advertises a zero window are probes and do not back off the RTO.
    pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&SenderMessage)) {
        if self.timer.tick(ms_since_last_tick).is_expired() {
            let Some(front) = self.outstanding.front() else {
                return;
            };
            transmit(front);
            if self.window_size != 0 {
                self.total_retransmission += 1;
                self.timer.exponential_backoff();
            }
            self.timer.reset();
        }
    }

    /// Sequence numbers sent but not yet acknowledged.
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.total_outstanding
    }

    /// Consecutive retransmissions since the last acknowledged progress.
    pub fn consecutive_retransmissions(&self) -> u64 {
        self.total_retransmission
    }

    /// Writer handle for the application to feed the outbound stream.
    pub fn writer(&mut self) -> Writer<'_> {
        self.input.writer()
    }

    /// Query surface of the outbound stream.
    pub fn input(&self) -> &ByteStream {
        &self.input
    }

    /// The derived lifecycle state.
    pub fn state(&self) -> SenderState {
        if !self.syn_sent {
            SenderState::Closed
        } else if self.fin_sent {
            if self.ack_abs_seqno == self.next_abs_seqno {
                SenderState::FinAcked
            } else {
                SenderState::FinSent
            }
        } else if self.ack_abs_seqno > 0 {
            SenderState::Established
        } else {
            SenderState::SynSent
        }
    }

    /// A zero advertised window is treated as one so the sender probes.
    fn effective_window(&self) -> u64 {
        u64::from(self.window_size).max(1)
    }
}
