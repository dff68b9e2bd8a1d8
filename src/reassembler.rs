//! Out-of-order substring reassembly.
//!
//! Fragments arrive as `(first_index, bytes, is_last)` triples, possibly out
//! of order and overlapping. Pending fragments live in a `BTreeMap` keyed by
//! stream index; whatever becomes contiguous with the output stream's push
//! point is drained into it immediately. Everything the reassembler holds
//! lies inside the acceptance window
//! `[bytes_pushed, bytes_pushed + available_capacity)` -- bytes outside it
//! are dropped on arrival.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::byte_stream::{ByteStream, Reader};

/// Reassembles indexed substrings into an owned [`ByteStream`].
#[derive(Debug)]
pub struct Reassembler {
    output: ByteStream,
    /// Pending fragments keyed by stream index. Non-overlapping, all within
    /// the acceptance window.
    pending: BTreeMap<u64, Bytes>,
    /// Sum of pending fragment lengths.
    total_pending: u64,
    /// Total stream length, recorded from the first fragment flagged last.
    end_index: Option<u64>,
}

impl Reassembler {
    /// Construct a reassembler writing into the given stream.
    pub fn new(output: ByteStream) -> Self {
        Self {
            output,
            pending: BTreeMap::new(),
            total_pending: 0,
            end_index: None,
        }
    }

    /// Insert a fragment of the stream beginning at `first_index`.
    ///
    /// Bytes already pushed and bytes beyond the acceptance window are
    /// trimmed away; a fragment entirely outside the window is dropped.
    /// Overlaps are resolved in favor of the most recent insert, except that
    /// an earlier fragment keeps its head where it starts before the new one.
    pub fn insert(&mut self, mut first_index: u64, mut data: Bytes, mut is_last: bool) {
        if data.is_empty() {
            // An empty last fragment still pins the stream length.
            if is_last && self.end_index.is_none() {
                self.end_index = Some(first_index);
            }
            return self.try_close();
        }

        if self.output.is_closed() || self.output.available_capacity() == 0 {
            return;
        }

        let unassembled = self.output.bytes_pushed();
        let unacceptable = unassembled + self.output.available_capacity();
        if first_index + data.len() as u64 <= unassembled || first_index >= unacceptable {
            return;
        }
        if first_index + data.len() as u64 > unacceptable {
            data = data.slice(..(unacceptable - first_index) as usize);
            // The trailing bytes were dropped, so this is no longer the end.
            is_last = false;
        }
        if first_index < unassembled {
            data = data.slice((unassembled - first_index) as usize..);
            first_index = unassembled;
        }

        if is_last && self.end_index.is_none() {
            self.end_index = Some(first_index + data.len() as u64);
        }

        // Split stored fragments at both edges of the new one, then replace
        // everything in between with the new bytes.
        let new_end = first_index + data.len() as u64;
        self.split(new_end);
        self.split(first_index);
        while let Some((&index, _)) = self.pending.range(first_index..new_end).next() {
            if let Some(run) = self.pending.remove(&index) {
                self.total_pending -= run.len() as u64;
            }
        }
        self.total_pending += data.len() as u64;
        self.pending.insert(first_index, data);

        // Drain whatever is now contiguous with the push point.
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() != self.output.bytes_pushed() {
                break;
            }
            let run = entry.remove();
            self.total_pending -= run.len() as u64;
            self.output.writer().push(run);
        }
        self.try_close();
    }

    /// Bytes held by the reassembler awaiting earlier gaps.
    pub fn bytes_pending(&self) -> u64 {
        self.total_pending
    }

    /// Query surface of the output stream.
    pub fn output(&self) -> &ByteStream {
        &self.output
    }

    /// Reader handle over the output stream.
    pub fn reader(&mut self) -> Reader<'_> {
        self.output.reader()
    }

    /// Raise the terminal error flag on the output stream.
    pub fn set_error(&mut self) {
        self.output.set_error();
    }

    /// Cut a stored fragment in two at `pos`, if one straddles it.
    fn split(&mut self, pos: u64) {
        let straddler = self
            .pending
            .range(..pos)
            .next_back()
            .map(|(&start, run)| (start, run.clone()));
        if let Some((start, run)) = straddler {
            if start + run.len() as u64 > pos {
                let cut = (pos - start) as usize;
                self.pending.insert(start, run.slice(..cut));
                self.pending.insert(pos, run.slice(cut..));
            }
        }
    }

    /// Close the output once every byte up to the recorded end is pushed.
    fn try_close(&mut self) {
        if self.end_index == Some(self.output.bytes_pushed()) {
            self.output.writer().close();
        }
    }
}
