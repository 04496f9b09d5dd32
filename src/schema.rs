//! Schema compilation — address maps and the process-wide schema registry.
//!
//! A schema is compiled once per distinct record type from its field
//! table, validated (unique addresses, bool-only tags), and memoized
//! for the process lifetime. Compiled schemas are immutable and freely
//! shareable across threads.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use serde::Serialize;
use tracing::debug;

use crate::codec::FieldCodec;
use crate::error::{ProtocolError, SchemaError};
use crate::record::{FieldAccess, ProtocolRecord};

// ─── AddressMap ─────────────────────────────────────────────────────

/// Immutable mapping of field names to bit addresses.
///
/// Invariants, established at compilation:
/// - addresses are unique within the schema,
/// - `start_address` is the minimum tagged address,
/// - `span_size` is `max - min + 1`, or 0 when nothing is tagged.
#[derive(Debug, Clone, Serialize)]
pub struct AddressMap {
    fields: HashMap<&'static str, u16>,
    start_address: u16,
    span_size: usize,
}

impl AddressMap {
    /// Resolve a field name to its address.
    ///
    /// # Errors
    /// `ProtocolError::UnknownField` if the field carries no address tag.
    pub fn address_of(&self, field: &str) -> Result<u16, ProtocolError> {
        self.fields
            .get(field)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownField(field.to_string()))
    }

    /// Whether the field carries an address tag.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Lowest tagged address (0 when the map is empty).
    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    /// Highest tagged address, if any field is tagged.
    pub fn end_address(&self) -> Option<u16> {
        if self.span_size == 0 {
            None
        } else {
            Some(self.start_address + (self.span_size - 1) as u16)
        }
    }

    /// Width of the contiguous span covering all tagged addresses.
    pub fn span_size(&self) -> usize {
        self.span_size
    }

    /// Number of tagged fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate `(field name, address)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u16)> + '_ {
        self.fields.iter().map(|(&name, &addr)| (name, addr))
    }
}

// ─── Schema ─────────────────────────────────────────────────────────

/// Compiled schema for one record type: its address map plus codec.
pub struct Schema<T> {
    map: AddressMap,
    codec: FieldCodec<T>,
}

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema").field("map", &self.map).finish_non_exhaustive()
    }
}

impl<T: ProtocolRecord> Schema<T> {
    /// Compile the schema from `T::FIELDS`, validating tags.
    fn compile() -> Result<Self, SchemaError> {
        let mut fields: HashMap<&'static str, u16> = HashMap::new();
        let mut by_address: HashMap<u16, &'static str> = HashMap::new();
        let mut min = u16::MAX;
        let mut max = 0u16;

        for def in T::FIELDS {
            let Some(address) = def.address else {
                continue;
            };
            if let FieldAccess::Opaque { type_name } = &def.access {
                return Err(SchemaError::InvalidTag {
                    field: def.name,
                    type_name: *type_name,
                    address,
                });
            }
            if let Some(&first) = by_address.get(&address) {
                return Err(SchemaError::DuplicateAddress {
                    address,
                    first,
                    second: def.name,
                });
            }
            by_address.insert(address, def.name);
            fields.insert(def.name, address);
            min = min.min(address);
            max = max.max(address);
        }

        let map = if fields.is_empty() {
            AddressMap {
                fields,
                start_address: 0,
                span_size: 0,
            }
        } else {
            AddressMap {
                fields,
                start_address: min,
                span_size: (max - min) as usize + 1,
            }
        };

        let codec = FieldCodec::build(&map);
        Ok(Self { map, codec })
    }

    /// Compiled schema for `T`, from the process-wide registry.
    ///
    /// The first call compiles and registers; every later call is a
    /// read-locked map lookup. A compilation failure is not cached —
    /// the same `SchemaError` is returned on each attempt.
    pub fn get() -> Result<&'static Self, SchemaError> {
        let key = TypeId::of::<T>();
        if let Some(&entry) = registry()
            .read()
            .expect("schema registry lock poisoned")
            .get(&key)
        {
            return Ok(downcast::<T>(entry));
        }

        let compiled = Self::compile()?;
        debug!(
            record = type_name::<T>(),
            start = compiled.map.start_address(),
            span = compiled.map.span_size(),
            fields = compiled.map.len(),
            "compiled protocol schema"
        );

        let mut reg = registry().write().expect("schema registry lock poisoned");
        // Another thread may have won the race; keep its entry.
        let entry: SchemaEntry = *reg.entry(key).or_insert_with(|| {
            let leaked: &'static Self = Box::leak(Box::new(compiled));
            leaked
        });
        Ok(downcast::<T>(entry))
    }

    /// The schema's address map.
    pub fn map(&self) -> &AddressMap {
        &self.map
    }

    /// The schema's field codec.
    pub fn codec(&self) -> &FieldCodec<T> {
        &self.codec
    }

    /// Shorthand for [`AddressMap::address_of`].
    pub fn address_of(&self, field: &str) -> Result<u16, ProtocolError> {
        self.map.address_of(field)
    }
}

// ─── Registry ───────────────────────────────────────────────────────

type SchemaEntry = &'static (dyn Any + Send + Sync);

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, SchemaEntry>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn registry() -> &'static RwLock<HashMap<TypeId, SchemaEntry>> {
    &REGISTRY
}

fn downcast<T: ProtocolRecord>(entry: SchemaEntry) -> &'static Schema<T> {
    entry
        .downcast_ref::<Schema<T>>()
        .expect("schema registry entry has wrong type")
}
