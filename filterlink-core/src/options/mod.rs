//! Filter options
//!
//! - [`id`]: process-wide name to id interning
//! - [`value`]: scalar values and `{name, value}` pairs
//! - [`descriptor`]: full declarations as advertised by the device
//! - [`model`]: the Option Model handed to consumers
//! - [`watcher`]: change-notification subscriptions

pub mod descriptor;
pub mod id;
pub mod model;
pub mod value;
pub mod watcher;

pub use descriptor::{OptionDescriptor, OptionRange};
pub use id::{find_option_id, option_name, register_option_by_name, OptionId};
pub use model::{OptionGetter, OptionModel, OptionSetter};
pub use value::{find_value, NamedValue, OptionKind, OptionValue};
pub use watcher::{OptionWatch, OptionsWatcher, Subscription};
