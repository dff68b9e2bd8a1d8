//! WireStream -- user-space TCP endpoint state machines.
//!
//! Implements the reliable, in-order byte-stream transport core restricted
//! to the endpoint logic:
//! - **ByteStream**: capacity-bounded FIFO with reader/writer capability handles
//! - **Reassembler**: out-of-order substring reassembly into the stream
//! - **TcpReceiver**: acknowledges contiguous bytes, advertises a window
//! - **TcpSender**: segmentation, window accounting, timer-driven retransmission
//! - **Wrap32**: 32-bit wrapping sequence arithmetic keyed off a per-connection ISN
//!
//! The network adapter, the peer, and the wall clock live outside the crate:
//! segments leave through a caller-supplied `transmit` callback and time
//! advances only through explicit `tick` calls.

pub mod byte_stream;
pub mod error;
pub mod message;
pub mod reassembler;
pub mod receiver;
pub mod sender;
pub mod wrap32;

// Re-export key public types at crate root.
pub use byte_stream::{ByteStream, Reader, Writer};
pub use error::{Result, WireStreamError};
pub use message::{ReceiverMessage, SenderMessage, MAX_PAYLOAD_SIZE};
pub use reassembler::Reassembler;
pub use receiver::TcpReceiver;
pub use sender::{SenderState, TcpSender};
pub use wrap32::Wrap32;
