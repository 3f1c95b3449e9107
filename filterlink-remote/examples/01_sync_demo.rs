//! Filter Options Synchronization Example
//!
//! Drives the embedded filters of a simulated device through the same API
//! an application would use against real hardware.
//!
//! ## What You'll Learn
//!
//! - Discovering a sensor's filters through capability queries
//! - Reading option metadata (range, step, default)
//! - Setting options and seeing them reach the device
//! - How range violations are reported before anything is sent
//! - Receiving device-originated changes as callbacks
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run -p filterlink-remote --example 01_sync_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use filterlink_core::capability::{GetFilters, SupportedFilters, TemporalAccess};
use filterlink_core::options::NamedValue;
use filterlink_core::{EmbeddedFilter, FilterType, OptionId};
use filterlink_remote::loopback::LoopbackDevice;
use filterlink_remote::{NotificationLoop, RemoteSensor, SyncConfig, GLOBAL_REGISTRY};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("FilterLink Options Synchronization Example");
    println!("==========================================\n");

    let config = SyncConfig::new().topic_root("rt/demo");
    let notifications = NotificationLoop::from_config(&config);
    let device = Arc::new(LoopbackDevice::new(&config));
    device.connect_notifications(notifications.sender());

    let sensor = RemoteSensor::builder("Depth Sensor")
        .config(config)
        .filter(device.advertise(FilterType::Decimation, "Decimation Filter"))
        .filter(device.advertise(FilterType::Temporal, "Temporal Filter"))
        .transport(device.clone())
        .notifications(&notifications)
        .build()?;

    // Discovery
    println!("Discovered Filters:");
    println!("-------------------");
    let supported = GLOBAL_REGISTRY
        .query::<SupportedFilters>(&sensor)
        .ok_or("sensor does not list its filters")?
        .supported_filters();
    let getter = GLOBAL_REGISTRY
        .query::<GetFilters>(&sensor)
        .ok_or("sensor does not hand out filters")?;
    for filter_type in &supported {
        let filter = getter.embedded_filter(*filter_type)?;
        println!("{} ({})", filter.name(), filter_type);
        for id in filter.supported_options() {
            let option = filter.option(id)?;
            let range = option.range();
            println!(
                "  {:<12} = {:<6} range [{:.2}, {:.2}] step {:.2} default {:.2}",
                option.name(),
                option.query()?.to_string(),
                range.min,
                range.max,
                range.step,
                range.default
            );
        }
    }

    // Decimation on/off
    println!("\nDecimation:");
    println!("-----------");
    let decimation = getter.embedded_filter(FilterType::Decimation)?;
    decimation.enable(true)?;
    println!("enabled  -> bytes {:?}", decimation.get()?.as_slice());
    decimation.enable(false)?;
    println!("disabled -> bytes {:?}", decimation.get()?.as_slice());

    // Temporal typed access
    println!("\nTemporal:");
    println!("---------");
    let temporal = getter.embedded_filter(FilterType::Temporal)?;
    let control = GLOBAL_REGISTRY
        .query::<TemporalAccess>(temporal.as_any())
        .ok_or("not a temporal filter")?;
    control.set_alpha(0.6)?;
    println!("alpha set to {:.2}", control.alpha()?);

    match temporal.option(OptionId::SMOOTH_ALPHA)?.set(1.5) {
        Ok(()) => println!("✗ alpha 1.5 accepted"),
        Err(e) => println!("✓ alpha 1.5 rejected locally: {}", e),
    }
    println!("device saw {} request(s)", device.requests().len());

    // Device-originated change
    println!("\nDevice Push:");
    println!("------------");
    let (tx, rx) = crossbeam_channel::bounded(1);
    let _subscription = temporal.option(OptionId::SMOOTH_DELTA)?.on_change(move |value| {
        let _ = tx.try_send(value);
    })?;
    device.push("Temporal Filter", vec![NamedValue::new("Delta", 55)])?;
    match rx.recv_timeout(Duration::from_secs(1)) {
        Ok(value) => println!("✓ delta changed on the device: {}", value),
        Err(_) => println!("✗ no notification received"),
    }

    let stats = filterlink_remote::FilterTransport::stats(device.as_ref());
    println!(
        "\nTransport: {} sent, {} failed, {} bytes, {} notifications",
        stats.messages_sent, stats.messages_failed, stats.bytes_sent, stats.notifications
    );

    Ok(())
}
