//! Process-wide option identifiers
//!
//! Option ids share one namespace across every filter in the process. A
//! fixed set of well-known names maps to stable ids; any other name the
//! device advertises is interned on first sight. Registration is idempotent:
//! asking twice for the same name returns the same id.
//!
//! The table is created lazily on first use and lives for the rest of the
//! process, so there is no teardown ordering to get wrong.

use core::fmt;
use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::constants::{ALPHA, DELTA, MAGNITUDE, PERSISTENCY, TOGGLE};

/// Numeric option identifier, unique per name within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub u32);

impl OptionId {
    /// Filter enable flag ("Toggle")
    pub const ENABLED: OptionId = OptionId(1);
    /// Decimation magnitude
    pub const MAGNITUDE: OptionId = OptionId(2);
    /// Temporal smoothing alpha
    pub const SMOOTH_ALPHA: OptionId = OptionId(3);
    /// Temporal smoothing delta
    pub const SMOOTH_DELTA: OptionId = OptionId(4);
    /// Temporal persistency index
    pub const PERSISTENCY: OptionId = OptionId(5);

    /// First id handed out to dynamically registered names
    pub const FIRST_DYNAMIC: u32 = 1000;

    /// True if this id came from dynamic registration
    pub fn is_dynamic(&self) -> bool {
        self.0 >= Self::FIRST_DYNAMIC
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match option_name(*self) {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "#{}", self.0),
        }
    }
}

const WELL_KNOWN: [(&str, OptionId); 5] = [
    (TOGGLE, OptionId::ENABLED),
    (MAGNITUDE, OptionId::MAGNITUDE),
    (ALPHA, OptionId::SMOOTH_ALPHA),
    (DELTA, OptionId::SMOOTH_DELTA),
    (PERSISTENCY, OptionId::PERSISTENCY),
];

struct InternTable {
    by_name: HashMap<String, OptionId>,
    by_id: HashMap<OptionId, String>,
    next: u32,
}

impl InternTable {
    fn new() -> Self {
        let mut table = Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            next: OptionId::FIRST_DYNAMIC,
        };
        for (name, id) in WELL_KNOWN {
            table.by_name.insert(name.to_string(), id);
            table.by_id.insert(id, name.to_string());
        }
        table
    }

    fn intern(&mut self, name: &str) -> OptionId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = OptionId(self.next);
        self.next += 1;
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
        id
    }
}

lazy_static::lazy_static! {
    static ref OPTION_IDS: Mutex<InternTable> = Mutex::new(InternTable::new());
}

/// Get the id for an option name, registering it if unseen
///
/// Names are exact-match and case-sensitive: "Alpha" and "alpha" are
/// different options.
pub fn register_option_by_name(name: &str) -> OptionId {
    // A poisoned table still holds consistent entries; intern never panics mid-insert.
    let mut table = OPTION_IDS.lock().unwrap_or_else(|e| e.into_inner());
    table.intern(name)
}

/// Look up an id without registering
pub fn find_option_id(name: &str) -> Option<OptionId> {
    let table = OPTION_IDS.lock().unwrap_or_else(|e| e.into_inner());
    table.by_name.get(name).copied()
}

/// Name registered for an id
pub fn option_name(id: OptionId) -> Option<String> {
    let table = OPTION_IDS.lock().unwrap_or_else(|e| e.into_inner());
    table.by_id.get(&id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn well_known_names_have_fixed_ids() {
        assert_eq!(register_option_by_name("Toggle"), OptionId::ENABLED);
        assert_eq!(register_option_by_name("Alpha"), OptionId::SMOOTH_ALPHA);
        assert_eq!(option_name(OptionId::PERSISTENCY).as_deref(), Some("Persistency"));
    }

    #[test]
    fn registration_is_idempotent() {
        let first = register_option_by_name("Hole Fill Mode");
        let second = register_option_by_name("Hole Fill Mode");
        assert_eq!(first, second);
        assert!(first.is_dynamic());
    }

    #[test]
    fn names_are_case_sensitive() {
        let upper = register_option_by_name("Spatial Radius");
        let lower = register_option_by_name("spatial radius");
        assert_ne!(upper, lower);
    }

    #[test]
    fn concurrent_registration_agrees() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| register_option_by_name("Concurrent Option")))
            .collect();
        let ids: Vec<OptionId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn lookup_does_not_register() {
        assert_eq!(find_option_id("Never Registered Option"), None);
        assert_eq!(find_option_id("Delta"), Some(OptionId::SMOOTH_DELTA));
    }
}
