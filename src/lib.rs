//! Typed protocol mapping for bit-addressable digital I/O.
//!
//! Client code declares a fixed-layout I/O protocol as a record whose
//! boolean fields are tagged with addresses in the controller's flat
//! bit space. The crate compiles that declaration once into an address
//! map, decodes/encodes raw bit spans against it, and batches many
//! single-bit writes into the fewest contiguous range writes.
//!
//! # Module Structure
//!
//! - [`record`] - Record declaration: `ProtocolRecord`, `bit_record!`
//! - [`schema`] - Schema compilation and the process-wide registry
//! - [`codec`] - Raw span ↔ record decode/encode
//! - [`batch`] - Write batching into minimal contiguous frames
//! - [`channel`] - Consumer facade binding a schema to a transport
//! - [`transport`] - The `BitTransport` contract and an in-memory bank
//! - [`error`] - Error taxonomy
//!
//! # Usage
//!
//! ```
//! use dio_protocol::{bit_record, IoChannel, MemoryTransport};
//!
//! bit_record! {
//!     /// Digital outputs of the loading station.
//!     pub struct LoaderOut {
//!         advance => 0,
//!         retract => 1,
//!         clamp => 4,
//!     }
//! }
//!
//! # fn main() -> Result<(), dio_protocol::ProtocolError> {
//! let mut chan: IoChannel<LoaderOut, _> = IoChannel::new(MemoryTransport::new(16))?;
//!
//! // Immediate single-field write, then a typed read-back.
//! chan.write_field("advance", true)?;
//! let state = chan.read_record()?;
//! assert!(state.advance);
//!
//! // Batched: two disjoint clusters flush as two range writes.
//! let frames = chan
//!     .batch()
//!     .set_field("retract", true)?
//!     .set_field("clamp", true)?
//!     .commit()?;
//! assert_eq!(frames, 2);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod channel;
pub mod codec;
pub mod error;
pub mod record;
pub mod schema;
pub mod transport;

pub use batch::{WriteBatch, WriteFrame};
pub use channel::{ChannelBatch, IoChannel};
pub use codec::FieldCodec;
pub use error::{CommitError, ProtocolError, SchemaError, TransportError};
pub use record::{FieldAccess, FieldDef, ProtocolRecord};
pub use schema::{AddressMap, Schema};
pub use transport::{BitTransport, MemoryTransport};
