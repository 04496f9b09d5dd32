//! Transport contract — the four bit-level primitives the protocol core
//! is built on, plus an in-memory implementation for tests and loopback
//! use.
//!
//! The transport is caller-supplied and opaque: the core never retries
//! a failed call and never blocks on its own.

use crate::error::TransportError;

/// Synchronous access to a flat boolean address space.
///
/// Implementations wrap the controller link (bus driver, native SDK,
/// simulator). Each call may fail with [`TransportError`]; any blocking
/// or timeout behavior lives behind this trait.
pub trait BitTransport {
    /// Read one bit.
    fn read_bit(&mut self, address: u16) -> Result<bool, TransportError>;

    /// Read the inclusive range `start..=end` as one call.
    fn read_bit_range(&mut self, start: u16, end: u16) -> Result<Vec<bool>, TransportError>;

    /// Write one bit.
    fn write_bit(&mut self, address: u16, value: bool) -> Result<(), TransportError>;

    /// Write `data` to the contiguous range starting at `start`.
    fn write_bit_range(&mut self, start: u16, data: &[bool]) -> Result<(), TransportError>;
}

// ─── MemoryTransport ────────────────────────────────────────────────

/// Error code reported when a scripted fault triggers.
const FAULT_CODE: i32 = -90;

/// In-memory bit bank implementing [`BitTransport`].
///
/// Backs the test suite and serves as a loopback transport. Counts
/// transport calls and supports one scripted fault: any operation that
/// touches the faulted address fails with a device error.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    bits: Vec<bool>,
    read_calls: u64,
    write_calls: u64,
    fail_at: Option<u16>,
}

impl MemoryTransport {
    /// Create a bank of `size` bits, all `false`.
    pub fn new(size: usize) -> Self {
        Self {
            bits: vec![false; size],
            read_calls: 0,
            write_calls: 0,
            fail_at: None,
        }
    }

    /// Create a bank preloaded with `bits`.
    pub fn with_bits(bits: Vec<bool>) -> Self {
        Self {
            bits,
            read_calls: 0,
            write_calls: 0,
            fail_at: None,
        }
    }

    /// Fail any operation touching `address` until [`clear_fault`](Self::clear_fault).
    pub fn fail_on(&mut self, address: u16) {
        self.fail_at = Some(address);
    }

    pub fn clear_fault(&mut self) {
        self.fail_at = None;
    }

    /// Peek a bit without counting as a transport call.
    pub fn get(&self, address: u16) -> bool {
        self.bits.get(address as usize).copied().unwrap_or(false)
    }

    /// Poke a bit without counting as a transport call.
    pub fn set(&mut self, address: u16, value: bool) {
        if let Some(slot) = self.bits.get_mut(address as usize) {
            *slot = value;
        }
    }

    /// Number of read calls (single and range) seen so far.
    pub fn read_calls(&self) -> u64 {
        self.read_calls
    }

    /// Number of write calls (single and range) seen so far.
    pub fn write_calls(&self) -> u64 {
        self.write_calls
    }

    fn check_fault(&self, start: u16, end: u16) -> Result<(), TransportError> {
        if let Some(fault) = self.fail_at
            && fault >= start
            && fault <= end
        {
            return Err(TransportError::Device {
                code: FAULT_CODE,
                address: fault,
            });
        }
        Ok(())
    }

    fn check_bounds(&self, address: u16) -> Result<(), TransportError> {
        if (address as usize) < self.bits.len() {
            Ok(())
        } else {
            Err(TransportError::Link(format!(
                "address {address} outside bank of {} bits",
                self.bits.len()
            )))
        }
    }
}

impl BitTransport for MemoryTransport {
    fn read_bit(&mut self, address: u16) -> Result<bool, TransportError> {
        self.read_calls += 1;
        self.check_fault(address, address)?;
        self.check_bounds(address)?;
        Ok(self.bits[address as usize])
    }

    fn read_bit_range(&mut self, start: u16, end: u16) -> Result<Vec<bool>, TransportError> {
        self.read_calls += 1;
        if end < start {
            return Err(TransportError::Link(format!(
                "inverted range {start}..={end}"
            )));
        }
        self.check_fault(start, end)?;
        self.check_bounds(end)?;
        Ok(self.bits[start as usize..=end as usize].to_vec())
    }

    fn write_bit(&mut self, address: u16, value: bool) -> Result<(), TransportError> {
        self.write_calls += 1;
        self.check_fault(address, address)?;
        self.check_bounds(address)?;
        self.bits[address as usize] = value;
        Ok(())
    }

    fn write_bit_range(&mut self, start: u16, data: &[bool]) -> Result<(), TransportError> {
        self.write_calls += 1;
        if data.is_empty() {
            return Ok(());
        }
        let end = start + (data.len() - 1) as u16;
        self.check_fault(start, end)?;
        self.check_bounds(end)?;
        self.bits[start as usize..=end as usize].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_round_trip() {
        let mut t = MemoryTransport::new(8);
        t.write_bit(3, true).unwrap();
        assert!(t.read_bit(3).unwrap());
        assert!(!t.read_bit(2).unwrap());
        assert_eq!(t.read_calls(), 2);
        assert_eq!(t.write_calls(), 1);
    }

    #[test]
    fn range_round_trip() {
        let mut t = MemoryTransport::new(8);
        t.write_bit_range(2, &[true, false, true]).unwrap();
        assert_eq!(t.read_bit_range(2, 4).unwrap(), vec![true, false, true]);
    }

    #[test]
    fn out_of_bounds_is_link_error() {
        let mut t = MemoryTransport::new(4);
        assert!(matches!(t.read_bit(4), Err(TransportError::Link(_))));
        assert!(matches!(
            t.write_bit_range(2, &[true, true, true]),
            Err(TransportError::Link(_))
        ));
    }

    #[test]
    fn inverted_range_rejected() {
        let mut t = MemoryTransport::new(8);
        assert!(matches!(
            t.read_bit_range(5, 2),
            Err(TransportError::Link(_))
        ));
    }

    #[test]
    fn scripted_fault_hits_ranges() {
        let mut t = MemoryTransport::new(16);
        t.fail_on(6);
        assert!(t.write_bit(5, true).is_ok());
        assert!(matches!(
            t.write_bit(6, true),
            Err(TransportError::Device { code: -90, address: 6 })
        ));
        assert!(t.read_bit_range(0, 5).is_ok());
        assert!(t.read_bit_range(4, 8).is_err());

        t.clear_fault();
        assert!(t.write_bit(6, true).is_ok());
    }
}
