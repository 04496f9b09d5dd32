//! Consumer facade — binds a compiled schema to a concrete transport.
//!
//! An `IoChannel` exposes single-field, whole-record and raw-span reads
//! and writes, plus batched writes through a guard that borrows the
//! channel mutably. That borrow is the channel-level invariant made
//! static: at most one in-flight write operation per channel.

use crate::batch::{WriteBatch, WriteFrame};
use crate::error::{CommitError, ProtocolError, SchemaError};
use crate::record::ProtocolRecord;
use crate::schema::Schema;
use crate::transport::BitTransport;

/// A typed channel over one record schema and one transport.
///
/// The channel is stateless between calls apart from an observational
/// read cache (the most recent raw span and decoded record); every read
/// method re-reads the transport.
///
/// Not internally synchronized — callers sharing a channel across
/// threads must serialize access themselves.
pub struct IoChannel<T: ProtocolRecord, Tr: BitTransport> {
    schema: &'static Schema<T>,
    transport: Tr,
    last_raw: Vec<bool>,
    last_record: Option<T>,
}

impl<T: ProtocolRecord, Tr: BitTransport> IoChannel<T, Tr> {
    /// Bind the schema of `T` to `transport`.
    ///
    /// Compiles the schema on first use of `T` in the process.
    pub fn new(transport: Tr) -> Result<Self, SchemaError> {
        let schema = Schema::<T>::get()?;
        Ok(Self {
            schema,
            transport,
            last_raw: vec![false; schema.map().span_size()],
            last_record: None,
        })
    }

    /// The compiled schema this channel is bound to.
    pub fn schema(&self) -> &'static Schema<T> {
        self.schema
    }

    /// Shared access to the underlying transport.
    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    /// Exclusive access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut Tr {
        &mut self.transport
    }

    /// Release the transport.
    pub fn into_transport(self) -> Tr {
        self.transport
    }

    // ─── Single-Field Access ────────────────────────────────────────

    /// Read one field's bit from the transport.
    pub fn read_field(&mut self, field: &str) -> Result<bool, ProtocolError> {
        let address = self.schema.address_of(field)?;
        let value = self.transport.read_bit(address)?;
        self.patch_cache(address, value);
        Ok(value)
    }

    /// Read one bit by raw address.
    pub fn read_bit(&mut self, address: u16) -> Result<bool, ProtocolError> {
        let value = self.transport.read_bit(address)?;
        self.patch_cache(address, value);
        Ok(value)
    }

    /// Write one field's bit immediately, unbatched.
    pub fn write_field(&mut self, field: &str, value: bool) -> Result<(), ProtocolError> {
        let address = self.schema.address_of(field)?;
        self.transport.write_bit(address, value)?;
        Ok(())
    }

    /// Write one bit by raw address, immediately.
    pub fn write_bit(&mut self, address: u16, value: bool) -> Result<(), ProtocolError> {
        self.transport.write_bit(address, value)?;
        Ok(())
    }

    // ─── Whole-Record Access ────────────────────────────────────────

    /// Read the full span and decode it into a record.
    pub fn read_record(&mut self) -> Result<T, ProtocolError> {
        let raw = self.fetch_span()?;
        let record = self.schema.codec().decode(&raw);
        self.last_raw = raw;
        self.last_record = Some(record.clone());
        Ok(record)
    }

    /// Encode a record and write the full span in one call.
    pub fn write_record(&mut self, value: &T) -> Result<(), ProtocolError> {
        let map = self.schema.map();
        if map.span_size() == 0 {
            return Ok(());
        }
        let data = self.schema.codec().encode(value);
        self.transport.write_bit_range(map.start_address(), &data)?;
        Ok(())
    }

    // ─── Raw Span Access ────────────────────────────────────────────

    /// Read the span as a raw boolean array.
    pub fn read_raw(&mut self) -> Result<Vec<bool>, ProtocolError> {
        let raw = self.fetch_span()?;
        self.last_raw = raw.clone();
        Ok(raw)
    }

    /// Write a span-aligned raw array, starting at the span's start
    /// address. `data` longer than the span is written as given.
    pub fn write_raw(&mut self, data: &[bool]) -> Result<(), ProtocolError> {
        if data.is_empty() {
            return Ok(());
        }
        self.transport
            .write_bit_range(self.schema.map().start_address(), data)?;
        Ok(())
    }

    // ─── Batched Writes ─────────────────────────────────────────────

    /// Start a write batch against this channel.
    ///
    /// The guard borrows the channel mutably, so no direct write can
    /// race the batch while it is open.
    pub fn batch(&mut self) -> ChannelBatch<'_, T, Tr> {
        ChannelBatch {
            batch: WriteBatch::bound_to(self.schema),
            channel: self,
        }
    }

    // ─── Read Cache ─────────────────────────────────────────────────

    /// Most recent raw span, as read by `read_record`/`read_raw` and
    /// patched by single-bit reads. Purely observational.
    pub fn last_raw(&self) -> &[bool] {
        &self.last_raw
    }

    /// Most recently decoded record, if any.
    pub fn last_record(&self) -> Option<&T> {
        self.last_record.as_ref()
    }

    fn fetch_span(&mut self) -> Result<Vec<bool>, ProtocolError> {
        let map = self.schema.map();
        let Some(end) = map.end_address() else {
            // Empty schema: nothing to read, no transport call.
            return Ok(Vec::new());
        };
        Ok(self.transport.read_bit_range(map.start_address(), end)?)
    }

    fn patch_cache(&mut self, address: u16, value: bool) {
        let start = self.schema.map().start_address();
        if address >= start
            && let Some(slot) = self.last_raw.get_mut((address - start) as usize)
        {
            *slot = value;
        }
    }
}

// ─── ChannelBatch ───────────────────────────────────────────────────

/// Batch guard returned by [`IoChannel::batch`].
///
/// Consuming builder: `set`/`set_field` chain by value and `commit`
/// flushes against the channel's transport.
pub struct ChannelBatch<'c, T: ProtocolRecord, Tr: BitTransport> {
    channel: &'c mut IoChannel<T, Tr>,
    batch: WriteBatch<T>,
}

impl<'c, T: ProtocolRecord, Tr: BitTransport> ChannelBatch<'c, T, Tr> {
    /// Record a pending value for one address (last-write-wins).
    pub fn set(mut self, address: u16, value: bool) -> Self {
        self.batch.set(address, value);
        self
    }

    /// Record a pending value for a field.
    pub fn set_field(mut self, field: &str, value: bool) -> Result<Self, ProtocolError> {
        self.batch.set_field(field, value)?;
        Ok(self)
    }

    /// Frames the pending set would currently flush as.
    pub fn frames(&self) -> Vec<WriteFrame> {
        self.batch.frames()
    }

    /// Number of addresses with a pending value.
    pub fn pending_len(&self) -> usize {
        self.batch.pending_len()
    }

    /// Flush the pending set as minimal contiguous frames.
    ///
    /// Returns the number of frames written. See
    /// [`WriteBatch::commit_to`] for the partial-application contract.
    pub fn commit(mut self) -> Result<usize, CommitError> {
        self.batch.commit_to(&mut self.channel.transport)
    }
}
