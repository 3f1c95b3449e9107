//! Codec and Option Model Example
//!
//! Works entirely offline: no device, no transport.
//!
//! ## What You'll Learn
//!
//! - The binary parameter layout of each filter type
//! - Converting between bytes and named options
//! - Range checking on option models
//! - Watching option changes
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run -p filterlink-core --example 01_codec_and_options
//! ```

use filterlink_core::codec::{self, FilterParams};
use filterlink_core::local::LocalTemporalFilter;
use filterlink_core::{EmbeddedFilter, FilterType, OptionId};

fn main() {
    println!("FilterLink Codec Example");
    println!("========================\n");

    println!("Wire Layouts:");
    println!("-------------");
    for filter_type in [FilterType::Decimation, FilterType::Temporal] {
        let defaults = FilterParams::defaults(filter_type);
        match codec::encode(&defaults) {
            Ok(bytes) => println!("{:<10} {:?}", filter_type, bytes.as_slice()),
            Err(e) => println!("{:<10} cannot encode: {}", filter_type, e),
        }
        for option in defaults.to_options() {
            println!("    {} = {}", option.name, option.value);
        }
    }

    println!("\nDecoding:");
    println!("---------");
    let samples: [&[u8]; 3] = [&[1, 2], &[1, 3], &[1, 2, 0]];
    for bytes in samples {
        match codec::decode(FilterType::Decimation, bytes) {
            Ok(params) => println!("✓ {:?} -> {:?}", bytes, params),
            Err(e) => println!("✗ {:?} -> {}", bytes, e),
        }
    }

    println!("\nOffline Temporal Filter:");
    println!("------------------------");
    let filter = LocalTemporalFilter::new("Temporal Filter");
    let Ok(alpha) = filter.option(OptionId::SMOOTH_ALPHA) else {
        println!("✗ filter has no alpha option");
        return;
    };
    let watch = alpha.watch().ok();
    for value in [0.25, 1.5, -0.1, 0.9] {
        match alpha.set(value) {
            Ok(()) => println!("✓ alpha {} accepted", value),
            Err(e) => println!("✗ alpha {} rejected: {}", value, e),
        }
    }
    if let Some(watch) = watch {
        while let Some(value) = watch.try_next() {
            println!("  watcher saw {}", value);
        }
    }
    match filter.get() {
        Ok(bytes) => println!("bytes now {:?}", bytes.as_slice()),
        Err(e) => println!("cannot encode: {}", e),
    }
}
