//! Option models, watchers and offline filters working together

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use common::Recorder;
use filterlink_core::capability::{CapabilityRegistry, TemporalAccess};
use filterlink_core::local::{self, LocalDecimationFilter, LocalTemporalFilter};
use filterlink_core::options::{register_option_by_name, OptionKind, OptionValue, OptionsWatcher};
use filterlink_core::{EmbeddedFilter, FilterError, OptionId, TemporalControl};

#[test]
fn alpha_change_reaches_only_alpha_subscribers() {
    let watcher = OptionsWatcher::new();
    let alpha = Recorder::new();
    let delta = Recorder::new();
    let _a = watcher.subscribe(OptionId::SMOOTH_ALPHA, alpha.callback()).unwrap();
    let _d = watcher.subscribe(OptionId::SMOOTH_DELTA, delta.callback()).unwrap();

    let id = register_option_by_name("Alpha");
    watcher.dispatch(&[(id, OptionValue::Float(0.7))]);

    assert_eq!(alpha.values(), vec![(OptionId::SMOOTH_ALPHA, OptionValue::Float(0.7))]);
    assert_eq!(delta.len(), 0);
}

#[test]
fn no_callbacks_after_destruction_under_concurrent_dispatch() {
    let watcher = OptionsWatcher::new();
    let late_hits = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicBool::new(false));
    let (hits, flag) = (late_hits.clone(), destroyed.clone());
    let _sub = watcher
        .subscribe(OptionId::SMOOTH_ALPHA, move |_, _| {
            if flag.load(Ordering::SeqCst) {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

    let producer = {
        let watcher = watcher.clone();
        thread::spawn(move || {
            for _ in 0..10_000 {
                watcher.dispatch(&[(OptionId::SMOOTH_ALPHA, OptionValue::Float(0.5))]);
            }
        })
    };

    thread::yield_now();
    watcher.begin_destruction();
    destroyed.store(true, Ordering::SeqCst);
    producer.join().unwrap();

    assert_eq!(late_hits.load(Ordering::SeqCst), 0);
}

#[test]
fn temporal_option_metadata_is_exposed() {
    let filter = LocalTemporalFilter::new("Temporal Filter");
    let alpha = filter.option(OptionId::SMOOTH_ALPHA).unwrap();
    assert_eq!(alpha.name(), "Alpha");
    assert_eq!(alpha.kind(), OptionKind::Float);
    let range = alpha.range();
    assert_eq!((range.min, range.max), (0.0, 1.0));
    assert!((range.default - 0.4).abs() < 1e-6);
    assert!(alpha.description().is_some());
    assert!(!alpha.is_read_only());

    let persistency = filter.option(OptionId::PERSISTENCY).unwrap();
    assert_eq!(persistency.kind(), OptionKind::Int);
    assert_eq!(persistency.range().max, 8.0);
}

#[test]
fn out_of_range_alpha_keeps_prior_value() {
    let filter = LocalTemporalFilter::new("Temporal Filter");
    let alpha = filter.option(OptionId::SMOOTH_ALPHA).unwrap();
    let err = alpha.set(1.5).unwrap_err();
    assert!(matches!(err, FilterError::OutOfRange { ref field, .. } if field == "Alpha"));
    assert_eq!(filter.alpha().unwrap(), 0.4);
}

#[test]
fn watch_channel_sees_local_changes() {
    let filter = LocalTemporalFilter::new("Temporal Filter");
    let watch = filter.option(OptionId::SMOOTH_DELTA).unwrap().watch().unwrap();
    filter.set_delta(35).unwrap();
    filter.set_delta(35).unwrap();
    filter.set_delta(40).unwrap();
    assert_eq!(watch.try_next(), Some(OptionValue::Int(35)));
    assert_eq!(watch.try_next(), Some(OptionValue::Int(40)));
    assert_eq!(watch.try_next(), None);
}

#[test]
fn capability_query_through_trait_object() {
    let registry = CapabilityRegistry::new();
    local::register_capabilities(&registry).unwrap();
    let filters: Vec<Box<dyn EmbeddedFilter>> = vec![
        Box::new(LocalDecimationFilter::new("Decimation Filter")),
        Box::new(LocalTemporalFilter::new("Temporal Filter")),
    ];

    let temporal: Vec<_> = filters
        .iter()
        .filter_map(|f| registry.query::<TemporalAccess>(f.as_any()))
        .collect();

    assert_eq!(temporal.len(), 1);
    temporal[0].set_persistency(4).unwrap();
    assert_eq!(temporal[0].persistency().unwrap(), 4);
}
