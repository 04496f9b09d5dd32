//! Write batching — collecting single-bit writes and flushing them as
//! the fewest contiguous range writes.
//!
//! Each transport write call has fixed overhead, so the batch merges
//! pending addresses into maximal contiguous runs: the number of frames
//! equals the number of disjoint address clusters touched, however many
//! `set` calls were made.

use std::collections::BTreeMap;
use std::mem;

use serde::Serialize;
use tracing::trace;

use crate::error::{CommitError, ProtocolError};
use crate::record::ProtocolRecord;
use crate::schema::Schema;
use crate::transport::BitTransport;

// ─── WriteFrame ─────────────────────────────────────────────────────

/// One contiguous run of addresses and the values to write there in a
/// single transport call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFrame {
    /// First address covered by this frame.
    pub start_address: u16,
    /// Values for `start_address..start_address + data.len()`.
    pub data: Vec<bool>,
}

impl WriteFrame {
    /// Last address covered by this frame (inclusive).
    pub fn end_address(&self) -> u16 {
        self.start_address + (self.data.len() - 1) as u16
    }

    /// Number of addresses covered.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ─── WriteBatch ─────────────────────────────────────────────────────

/// Accumulator for batched digital output writes.
///
/// Bound to one schema for field-name resolution. Pending values are
/// last-write-wins per address. Exclusively owned; not meant to be
/// shared across threads.
pub struct WriteBatch<T: ProtocolRecord> {
    schema: &'static Schema<T>,
    // BTreeMap keeps addresses sorted for the single-pass merge scan.
    pending: BTreeMap<u16, bool>,
}

impl<T: ProtocolRecord> WriteBatch<T> {
    /// Create an empty batch bound to the schema of `T`.
    pub fn new() -> Result<Self, ProtocolError> {
        Ok(Self::bound_to(Schema::<T>::get()?))
    }

    pub(crate) fn bound_to(schema: &'static Schema<T>) -> Self {
        Self {
            schema,
            pending: BTreeMap::new(),
        }
    }

    /// Record a pending value for one address, overwriting any earlier
    /// pending value there (last-write-wins).
    pub fn set(&mut self, address: u16, value: bool) -> &mut Self {
        self.pending.insert(address, value);
        self
    }

    /// Resolve `field` through the schema and record its pending value.
    ///
    /// # Errors
    /// `ProtocolError::UnknownField` if the field carries no address tag.
    pub fn set_field(&mut self, field: &str, value: bool) -> Result<&mut Self, ProtocolError> {
        let address = self.schema.address_of(field)?;
        Ok(self.set(address, value))
    }

    /// Number of addresses with a pending value.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop all pending values without committing.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Merge the pending set into maximal contiguous frames, ascending
    /// by start address.
    pub fn frames(&self) -> Vec<WriteFrame> {
        let mut frames = Vec::new();
        let mut iter = self.pending.iter();
        let Some((&first, &value)) = iter.next() else {
            return frames;
        };

        let mut start = first;
        let mut data = vec![value];
        for (&address, &value) in iter {
            // Widened to u32: a run ending at u16::MAX must not wrap.
            if u32::from(address) == u32::from(start) + data.len() as u32 {
                data.push(value);
            } else {
                frames.push(WriteFrame {
                    start_address: start,
                    data: mem::take(&mut data),
                });
                start = address;
                data.push(value);
            }
        }
        frames.push(WriteFrame {
            start_address: start,
            data,
        });
        frames
    }

    /// Build frames and hand each to `write_bit_range`, ascending.
    ///
    /// Returns the number of frames written. Not transactional: on a
    /// transport failure the remaining frames are aborted and the
    /// returned [`CommitError`] reports how many frames were already
    /// applied. Pending values are kept on failure so the caller can
    /// inspect or retry; a fully successful commit clears them, making
    /// an immediate second commit a no-op with zero transport calls.
    pub fn commit_to<Tr: BitTransport + ?Sized>(
        &mut self,
        transport: &mut Tr,
    ) -> Result<usize, CommitError> {
        let frames = self.frames();
        for (applied, frame) in frames.iter().enumerate() {
            transport
                .write_bit_range(frame.start_address, &frame.data)
                .map_err(|source| CommitError {
                    frames_applied: applied,
                    failed_start: frame.start_address,
                    source,
                })?;
        }
        trace!(
            frames = frames.len(),
            bits = self.pending.len(),
            "committed write batch"
        );
        self.pending.clear();
        Ok(frames.len())
    }
}
