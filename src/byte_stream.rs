//! Capacity-bounded byte FIFO with split reader/writer capabilities.
//!
//! One `ByteStream` holds the state; `Reader` and `Writer` are disjoint
//! borrow-based handles over it, so the application side and the transport
//! side each see only the surface they are entitled to. Bytes are stored as
//! a queue of `Bytes` chunks, so pushes, pops, and trims are refcounted
//! slices rather than copies.

use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};

/// A bounded in-order byte stream with one-way `closed` and `error` flags.
#[derive(Debug)]
pub struct ByteStream {
    capacity: u64,
    chunks: VecDeque<Bytes>,
    total_pushed: u64,
    total_popped: u64,
    total_buffered: u64,
    closed: bool,
    error: bool,
}

impl ByteStream {
    /// Create a stream that buffers at most `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            chunks: VecDeque::new(),
            total_pushed: 0,
            total_popped: 0,
            total_buffered: 0,
            closed: false,
            error: false,
        }
    }

    /// The writer-side capability handle.
    pub fn writer(&mut self) -> Writer<'_> {
        Writer(self)
    }

    /// The reader-side capability handle.
    pub fn reader(&mut self) -> Reader<'_> {
        Reader(self)
    }

    /// Raise the terminal error flag.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes that can still be pushed before the buffer is full.
    pub fn available_capacity(&self) -> u64 {
        self.capacity - self.total_buffered
    }

    pub fn bytes_buffered(&self) -> u64 {
        self.total_buffered
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn bytes_popped(&self) -> u64 {
        self.total_popped
    }

    /// Whether the writer has declared the stream complete.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closed and fully drained.
    pub fn is_finished(&self) -> bool {
        self.closed && self.total_buffered == 0
    }
}

/// Write-side capability over a [`ByteStream`].
#[derive(Debug)]
pub struct Writer<'a>(&'a mut ByteStream);

impl Writer<'_> {
    /// Append as much of `data` as fits in the available capacity.
    ///
    /// The surplus tail is dropped silently; pushing to a closed or full
    /// stream, or pushing nothing, is a no-op.
    pub fn push(&mut self, mut data: Bytes) {
        if self.0.closed || self.0.available_capacity() == 0 || data.is_empty() {
            return;
        }
        let n = self.0.available_capacity().min(data.len() as u64);
        if n < data.len() as u64 {
            data.truncate(n as usize);
        }
        self.0.total_buffered += n;
        self.0.total_pushed += n;
        self.0.chunks.push_back(data);
    }

    /// Declare that no further bytes will be pushed. One-way.
    pub fn close(&mut self) {
        self.0.closed = true;
    }

    /// Raise the terminal error flag. One-way.
    pub fn set_error(&mut self) {
        self.0.set_error();
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    pub fn available_capacity(&self) -> u64 {
        self.0.available_capacity()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.0.bytes_pushed()
    }

    pub fn has_error(&self) -> bool {
        self.0.has_error()
    }
}

/// Read-side capability over a [`ByteStream`].
#[derive(Debug)]
pub struct Reader<'a>(&'a mut ByteStream);

impl Reader<'_> {
    /// A view of the contiguous front of the buffer.
    ///
    /// May be shorter than `bytes_buffered`; empty iff the buffer is empty.
    pub fn peek(&self) -> &[u8] {
        self.0.chunks.front().map(|chunk| chunk.as_ref()).unwrap_or(&[])
    }

    /// Discard `len` bytes from the front.
    ///
    /// Caller contract: `len <= bytes_buffered`.
    pub fn pop(&mut self, mut len: u64) {
        debug_assert!(len <= self.0.total_buffered, "pop past buffered bytes");
        let len_popped = len.min(self.0.total_buffered);
        self.0.total_buffered -= len_popped;
        self.0.total_popped += len_popped;
        while len > 0 {
            let Some(front) = self.0.chunks.front_mut() else {
                break;
            };
            let front_len = front.len() as u64;
            if len < front_len {
                front.advance(len as usize);
                break;
            }
            self.0.chunks.pop_front();
            len -= front_len;
        }
    }

    /// Drain up to `limit` bytes across chunk boundaries.
    ///
    /// Returns fewer bytes only when the buffer runs dry. A single-chunk
    /// read is a refcounted slice, not a copy.
    pub fn read(&mut self, limit: u64) -> Bytes {
        let len = limit.min(self.0.total_buffered);
        if len == 0 {
            return Bytes::new();
        }
        if let Some(front) = self.0.chunks.front() {
            if front.len() as u64 >= len {
                let out = front.slice(..len as usize);
                self.pop(len);
                return out;
            }
        }
        let mut out = BytesMut::with_capacity(len as usize);
        while (out.len() as u64) < len {
            let view = self.peek();
            let take = view.len().min((len - out.len() as u64) as usize);
            out.extend_from_slice(&view[..take]);
            self.pop(take as u64);
        }
        out.freeze()
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    pub fn bytes_buffered(&self) -> u64 {
        self.0.bytes_buffered()
    }

    pub fn bytes_popped(&self) -> u64 {
        self.0.bytes_popped()
    }

    pub fn has_error(&self) -> bool {
        self.0.has_error()
    }
}
