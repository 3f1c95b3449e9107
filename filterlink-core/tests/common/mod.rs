//! Shared strategies and fixtures for integration tests
//!
//! - Strategies for valid and invalid parameter sets of each filter type
//! - Raw byte strategies that cover both well-formed and malformed buffers
//! - A recording callback for watcher assertions

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use filterlink_core::codec::{DecimationParams, TemporalParams};
use filterlink_core::constants::temporal::{
    ALPHA_MAX, ALPHA_MIN, DELTA_MAX, DELTA_MIN, PERSISTENCY_MAX, PERSISTENCY_MIN,
};
use filterlink_core::options::{OptionId, OptionValue};
use proptest::prelude::*;

/// Every valid decimation parameter set
pub fn valid_decimation() -> impl Strategy<Value = DecimationParams> {
    any::<bool>().prop_map(|enabled| DecimationParams {
        enabled,
        magnitude: 2,
    })
}

/// Valid temporal parameter sets across the full ranges
pub fn valid_temporal() -> impl Strategy<Value = TemporalParams> {
    (
        any::<bool>(),
        ALPHA_MIN..=ALPHA_MAX,
        DELTA_MIN..=DELTA_MAX,
        PERSISTENCY_MIN..=PERSISTENCY_MAX,
    )
        .prop_map(|(enabled, alpha, delta, persistency)| TemporalParams {
            enabled,
            alpha,
            delta,
            persistency,
        })
}

/// Temporal sets with at least one field out of range
pub fn invalid_temporal() -> impl Strategy<Value = TemporalParams> {
    let bad_alpha = prop_oneof![
        (-1000.0f32..-0.001f32),
        (1.001f32..1000.0f32),
    ];
    let bad_delta = prop_oneof![(i32::MIN..DELTA_MIN), (DELTA_MAX + 1..=i32::MAX)];
    let bad_persistency = prop_oneof![
        (i32::MIN..PERSISTENCY_MIN),
        (PERSISTENCY_MAX + 1..=i32::MAX),
    ];
    prop_oneof![
        (valid_temporal(), bad_alpha).prop_map(|(p, alpha)| TemporalParams { alpha, ..p }),
        (valid_temporal(), bad_delta).prop_map(|(p, delta)| TemporalParams { delta, ..p }),
        (valid_temporal(), bad_persistency)
            .prop_map(|(p, persistency)| TemporalParams { persistency, ..p }),
    ]
}

/// Arbitrary byte buffers up to twice the longest layout
pub fn raw_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=26)
}

/// Collects every (id, value) a watcher delivers
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<(OptionId, OptionValue)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl Fn(OptionId, OptionValue) + Send + Sync + 'static {
        let seen = self.seen.clone();
        move |id, value| seen.lock().unwrap().push((id, value))
    }

    pub fn values(&self) -> Vec<(OptionId, OptionValue)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}
