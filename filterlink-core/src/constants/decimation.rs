//! Decimation Filter Wire Layout
//!
//! ```text
//! byte 0   enabled flag (0 or 1)
//! byte 1   magnitude (u8, must be 2)
//! ```

/// Exact parameter buffer length in bytes.
pub const BUFFER_LEN: usize = 2;

/// Offset of the enabled flag.
pub const ENABLED_OFFSET: usize = 0;

/// Offset of the one-byte magnitude field.
///
/// One code path on the device historically validated this as a 4-byte
/// integer; the wire carries a single byte and that is what we encode.
pub const MAGNITUDE_OFFSET: usize = 1;

/// The only magnitude the hardware accepts.
///
/// Represented as a parameter for symmetry with other filters, but fixed
/// by the decimation block in firmware.
pub const MAGNITUDE: i64 = 2;

/// Option names of a complete decimation options update, in wire order.
pub const OPTION_NAMES: &[&str] = &[super::TOGGLE, super::MAGNITUDE];
