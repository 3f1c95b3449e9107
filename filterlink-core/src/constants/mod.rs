//! Constants for FilterLink Core
//!
//! Wire layouts, option names and parameter ranges live here so the codec,
//! the option models and the remote proxy agree on one definition.
//!
//! ## Organization
//!
//! - **Decimation**: two-byte layout and the fixed magnitude
//! - **Temporal**: thirteen-byte layout, ranges and defaults
//! - **Option names**: exact, case-sensitive names used on the wire

/// Decimation filter layout and limits.
pub mod decimation;

/// Temporal filter layout, ranges and defaults.
pub mod temporal;

/// Enable flag option name, shared by every filter.
pub const TOGGLE: &str = "Toggle";

/// Decimation magnitude option name.
pub const MAGNITUDE: &str = "Magnitude";

/// Temporal smoothing factor option name.
pub const ALPHA: &str = "Alpha";

/// Temporal edge threshold option name.
pub const DELTA: &str = "Delta";

/// Temporal persistency index option name.
pub const PERSISTENCY: &str = "Persistency";

/// Suffix under which a filter's enable flag is persisted.
pub const ENABLED_SETTING_SUFFIX: &str = "enabled";

/// Largest parameter buffer of any filter type, in bytes.
pub const MAX_PARAMETER_BYTES: usize = 16;

const _: () = assert!(decimation::BUFFER_LEN <= MAX_PARAMETER_BYTES);
const _: () = assert!(temporal::BUFFER_LEN <= MAX_PARAMETER_BYTES);
