//! Record declaration surface — the `ProtocolRecord` trait, field
//! descriptors, and the `bit_record!` macro.
//!
//! A protocol record is a plain struct whose boolean fields are tagged
//! with addresses in the controller's flat bit space. The descriptor
//! table is produced at declaration time, so field access at runtime is
//! a plain `fn` call with no metadata lookup.

// ─── Field Descriptors ──────────────────────────────────────────────

/// How a field is accessed, and whether it is addressable at all.
pub enum FieldAccess<T> {
    /// A boolean field with compiled get/set accessors.
    Bit {
        get: fn(&T) -> bool,
        set: fn(&mut T, bool),
    },
    /// A non-boolean field. May not carry an address tag.
    Opaque { type_name: &'static str },
}

// Manual impls: a derive would demand `T: Copy`, but only fn pointers
// and static strings are stored.
impl<T> Clone for FieldAccess<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for FieldAccess<T> {}

/// Declaration-time description of one record field.
///
/// `address` is the optional tag; untagged fields are excluded from the
/// address map and never touched by reads or writes.
pub struct FieldDef<T> {
    pub name: &'static str,
    pub address: Option<u16>,
    pub access: FieldAccess<T>,
}

impl<T> FieldDef<T> {
    /// Descriptor for a tagged boolean field.
    pub const fn bit(
        name: &'static str,
        address: u16,
        get: fn(&T) -> bool,
        set: fn(&mut T, bool),
    ) -> Self {
        Self {
            name,
            address: Some(address),
            access: FieldAccess::Bit { get, set },
        }
    }
}

// ─── ProtocolRecord ─────────────────────────────────────────────────

/// A record type mappable onto the bit address space.
///
/// Usually implemented via [`bit_record!`](crate::bit_record); a manual
/// implementation only needs to list the fields. Decoding starts from
/// `Default::default()` — a field whose address falls outside the data
/// actually read keeps its default value.
pub trait ProtocolRecord: Default + Clone + Send + Sync + 'static {
    /// Declaration-order field table. Inspected once per process when
    /// the schema for this type is first compiled.
    const FIELDS: &'static [FieldDef<Self>];
}

// ─── bit_record! ────────────────────────────────────────────────────

/// Declares a protocol record struct with address-tagged boolean fields.
///
/// Every field is `pub bool`; the `=> N` arrow assigns the bit address.
/// Addresses need not start at zero or be contiguous — gaps simply
/// widen the span.
///
/// ```
/// use dio_protocol::bit_record;
///
/// bit_record! {
///     /// Digital outputs of the operator station.
///     pub struct PanelOutputs {
///         /// Run lamp.
///         run => 0,
///         stop => 1,
///         fault_lamp => 4,
///     }
/// }
/// ```
///
/// Fields of other types, or untagged fields, require a manual
/// [`ProtocolRecord`](crate::record::ProtocolRecord) implementation.
#[macro_export]
macro_rules! bit_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident => $addr:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis struct $name {
            $( $(#[$fmeta])* pub $field: bool, )+
        }

        impl $crate::record::ProtocolRecord for $name {
            const FIELDS: &'static [$crate::record::FieldDef<Self>] = &[
                $(
                    $crate::record::FieldDef::bit(
                        stringify!($field),
                        $addr,
                        |r: &Self| r.$field,
                        |r: &mut Self, v: bool| r.$field = v,
                    ),
                )+
            ];
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    bit_record! {
        /// Minimal test record.
        pub struct Buttons {
            start => 0,
            stop => 1,
            estop => 2,
        }
    }

    #[test]
    fn macro_generates_field_table() {
        assert_eq!(Buttons::FIELDS.len(), 3);
        assert_eq!(Buttons::FIELDS[0].name, "start");
        assert_eq!(Buttons::FIELDS[0].address, Some(0));
        assert_eq!(Buttons::FIELDS[2].name, "estop");
        assert_eq!(Buttons::FIELDS[2].address, Some(2));
    }

    #[test]
    fn accessors_round_trip() {
        let mut b = Buttons::default();
        assert!(!b.start);
        let FieldAccess::Bit { get, set } = &Buttons::FIELDS[0].access else {
            panic!("expected bit access");
        };
        set(&mut b, true);
        assert!(b.start);
        assert!(get(&b));
    }

    #[test]
    fn record_derives_serde() {
        let b = Buttons {
            start: true,
            stop: false,
            estop: true,
        };
        let json = serde_json::to_string(&b).unwrap();
        let back: Buttons = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
