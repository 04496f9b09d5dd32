//! Error types for schema compilation, field resolution and transport I/O.
//!
//! Taxonomy:
//! - `SchemaError` — schema compilation failures, fatal to that schema.
//! - `TransportError` — surfaced verbatim from the transport, never retried.
//! - `CommitError` — a write batch aborted mid-flight (commit is not
//!   transactional; the report tells the caller how far it got).
//! - `ProtocolError` — umbrella returned by channel-level operations.

use thiserror::Error;

/// Schema compilation error.
///
/// Raised once, at first use of a record type. A schema that fails to
/// compile is never registered; the same error is returned on every
/// subsequent attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields carry the same address tag.
    #[error("fields '{first}' and '{second}' both tagged with address {address}")]
    DuplicateAddress {
        address: u16,
        first: &'static str,
        second: &'static str,
    },

    /// A non-boolean field carries an address tag.
    #[error("field '{field}' ({type_name}) carries address tag {address}, but only bool fields may be tagged")]
    InvalidTag {
        field: &'static str,
        type_name: &'static str,
        address: u16,
    },
}

/// Transport failure reported by the external controller link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The controller rejected the operation with a native error code.
    #[error("controller error {code} at address {address}")]
    Device { code: i32, address: u16 },

    /// The link itself failed (disconnect, timeout, framing).
    #[error("link error: {0}")]
    Link(String),
}

/// A write batch commit aborted on a transport failure.
///
/// Commit applies frames in ascending start-address order and stops at
/// the first failure. Frames `0..frames_applied` reached the transport;
/// the frame starting at `failed_start` and everything after it did not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "write batch aborted at frame starting at address {failed_start} \
     ({frames_applied} frame(s) already written): {source}"
)]
pub struct CommitError {
    /// Number of frames fully handed to the transport before the failure.
    pub frames_applied: usize,
    /// Start address of the frame that failed.
    pub failed_start: u16,
    /// The underlying transport failure.
    #[source]
    pub source: TransportError,
}

/// Umbrella error for channel-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A field selector that carries no address tag (or does not exist).
    #[error("field '{0}' carries no address tag")]
    UnknownField(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}
