//! Temporal Filter Wire Layout
//!
//! ```text
//! byte  0       enabled flag (0 or 1)
//! bytes 1..5    alpha        f32 little-endian   [0.0, 1.0]   default 0.4
//! bytes 5..9    delta        i32 little-endian   [0, 100]     default 20
//! bytes 9..13   persistency  i32 little-endian   [0, 8]       default 3
//! ```
//!
//! Persistency is a full 4-byte field at offset 9. An older reader fetched a
//! single byte at offset 13, one past the end of the buffer.

/// Exact parameter buffer length in bytes.
pub const BUFFER_LEN: usize = 13;

/// Offset of the enabled flag.
pub const ENABLED_OFFSET: usize = 0;

/// Offset of the 4-byte alpha field.
pub const ALPHA_OFFSET: usize = 1;

/// Offset of the 4-byte delta field.
pub const DELTA_OFFSET: usize = 5;

/// Offset of the 4-byte persistency field.
pub const PERSISTENCY_OFFSET: usize = 9;

/// Smallest smoothing factor.
pub const ALPHA_MIN: f32 = 0.0;
/// Largest smoothing factor.
pub const ALPHA_MAX: f32 = 1.0;
/// Smoothing factor step advertised to UIs.
pub const ALPHA_STEP: f32 = 0.1;
/// Smoothing factor the device starts with.
pub const ALPHA_DEFAULT: f32 = 0.4;

/// Smallest edge-preserving threshold.
pub const DELTA_MIN: i32 = 0;
/// Largest edge-preserving threshold.
pub const DELTA_MAX: i32 = 100;
/// Edge-preserving threshold the device starts with.
pub const DELTA_DEFAULT: i32 = 20;

/// Smallest persistency index.
pub const PERSISTENCY_MIN: i32 = 0;
/// Largest persistency index.
pub const PERSISTENCY_MAX: i32 = 8;
/// Persistency index the device starts with.
pub const PERSISTENCY_DEFAULT: i32 = 3;

/// Option names of a complete temporal options update, in wire order.
pub const OPTION_NAMES: &[&str] = &[
    super::TOGGLE,
    super::ALPHA,
    super::DELTA,
    super::PERSISTENCY,
];
