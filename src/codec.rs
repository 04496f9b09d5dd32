//! Field codec — decoding raw bit spans into records and back.
//!
//! Accessor slots are resolved once when the schema compiles; decode and
//! encode are then pure loops over `fn` pointers, with no metadata
//! lookup per call.

use crate::record::{FieldAccess, ProtocolRecord};
use crate::schema::AddressMap;

/// One mapped field with its resolved accessors.
struct FieldSlot<T> {
    address: u16,
    get: fn(&T) -> bool,
    set: fn(&mut T, bool),
}

/// Codec between a record type and its span-aligned raw bit buffer.
///
/// Bound to the address map it was built from: index `i` of a raw
/// buffer corresponds to address `start_address + i`.
pub struct FieldCodec<T> {
    start_address: u16,
    span_size: usize,
    slots: Vec<FieldSlot<T>>,
}

impl<T: ProtocolRecord> FieldCodec<T> {
    /// Resolve accessor slots for every mapped field.
    ///
    /// Called once per schema compilation; the map has already been
    /// validated, so every mapped field is a bit field.
    pub(crate) fn build(map: &AddressMap) -> Self {
        let mut slots = Vec::with_capacity(map.len());
        for def in T::FIELDS {
            let Some(address) = def.address else {
                continue;
            };
            if let FieldAccess::Bit { get, set } = def.access {
                slots.push(FieldSlot { address, get, set });
            }
        }
        Self {
            start_address: map.start_address(),
            span_size: map.span_size(),
            slots,
        }
    }

    /// Span width this codec encodes to.
    pub fn span_size(&self) -> usize {
        self.span_size
    }

    /// Decode a span-aligned raw buffer into a fresh record.
    ///
    /// `raw[0]` corresponds to `start_address`. A field whose index
    /// falls outside `raw` keeps its default value — a short buffer
    /// means "not yet read", not an error.
    pub fn decode(&self, raw: &[bool]) -> T {
        let mut record = T::default();
        for slot in &self.slots {
            let idx = (slot.address - self.start_address) as usize;
            if let Some(&bit) = raw.get(idx) {
                (slot.set)(&mut record, bit);
            }
        }
        record
    }

    /// Encode a record into a span-sized raw buffer.
    ///
    /// Unmapped positions (gaps in the address layout) are `false`.
    pub fn encode(&self, value: &T) -> Vec<bool> {
        let mut out = vec![false; self.span_size];
        for slot in &self.slots {
            out[(slot.address - self.start_address) as usize] = (slot.get)(value);
        }
        out
    }
}
