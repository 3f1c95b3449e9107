//! Fixed-Capacity Parameter Buffers
//!
//! ## Overview
//!
//! A parameter buffer is the legacy on-wire form of a filter's settings: a
//! short byte sequence with one fixed layout per filter type. Buffers never
//! exceed [`MAX_PARAMETER_BYTES`], so storage is inline (`heapless::Vec`) and
//! building one never touches the heap.
//!
//! A `ParameterBuffer` only guarantees capacity. Whether the bytes form a
//! valid decimation or temporal payload is decided by the codec, which
//! validates on both encode and decode.
//!
//! ## Usage Example
//!
//! ```rust
//! use filterlink_core::buffer::ParameterBuffer;
//!
//! let buffer = ParameterBuffer::from_slice(&[1, 2]).unwrap();
//! assert_eq!(buffer.as_slice(), &[1, 2]);
//! assert_eq!(buffer.len(), 2);
//! ```

use core::fmt;
use core::ops::Deref;

use heapless::Vec;

use crate::constants::MAX_PARAMETER_BYTES;

/// Error returned when bytes do not fit in a parameter buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    /// Number of bytes offered
    pub len: usize,
}

impl fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes exceed parameter buffer capacity of {}",
            self.len, MAX_PARAMETER_BYTES
        )
    }
}

/// Inline byte buffer holding one filter's wire parameters
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ParameterBuffer {
    bytes: Vec<u8, MAX_PARAMETER_BYTES>,
}

impl ParameterBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Copy bytes into a new buffer
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CapacityExceeded> {
        Vec::from_slice(bytes)
            .map(|bytes| Self { bytes })
            .map_err(|_| CapacityExceeded { len: bytes.len() })
    }

    /// Append one byte
    pub fn push(&mut self, byte: u8) -> Result<(), CapacityExceeded> {
        self.bytes
            .push(byte)
            .map_err(|_| CapacityExceeded { len: self.bytes.len() + 1 })
    }

    /// Append a little-endian encoded field
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), CapacityExceeded> {
        let len = self.bytes.len() + bytes.len();
        self.bytes
            .extend_from_slice(bytes)
            .map_err(|_| CapacityExceeded { len })
    }

    /// Borrow the raw bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy out as an owned vector (for transports that need one)
    pub fn to_vec(&self) -> std::vec::Vec<u8> {
        self.bytes.to_vec()
    }
}

impl Deref for ParameterBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for ParameterBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ParameterBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterBuffer{:?}", self.as_slice())
    }
}

impl PartialEq<[u8]> for ParameterBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl<const N: usize> PartialEq<[u8; N]> for ParameterBuffer {
    fn eq(&self, other: &[u8; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}
