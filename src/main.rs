//! Demo driver for the adaptive performance monitor.
//!
//! Simulates a render loop that runs healthy, falls into an overloaded
//! stretch, then recovers, and logs every degradation decision.

use adaptive_perf_monitor::logging::{self, LogOptions};
use adaptive_perf_monitor::{ConfigManager, ConfigUpdate, MonitorCallbacks, PerformanceMonitor};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Particle pool size of the simulated renderer
const PARTICLE_COUNT: u32 = 5000;
/// Hand-tracking poll interval while healthy
const GESTURE_INTERVAL_MS: u64 = 33;

/// Simulated load profile: (frames per second, seconds)
const LOAD_PROFILE: &[(u32, u64)] = &[(60, 3), (15, 6), (60, 6)];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = LogOptions::default()
        .with_default_file_output()
        .and_then(logging::init_logging)
        .map_err(|e| {
            eprintln!("Failed to initialize logging: {}", e);
            e
        })?;

    let config_path = ConfigManager::default_path();
    let config_manager = ConfigManager::load_or_default(&config_path)?;
    info!("Configuration loaded from {:?}", config_path);

    let callbacks = MonitorCallbacks::new()
        .on_fps_update(|fps| info!(fps, "FPS sample"))
        .on_degradation_triggered(|| info!("Shedding load"))
        .on_degradation_restored(|| info!("Restoring full load"));

    let mut monitor = PerformanceMonitor::new(
        PARTICLE_COUNT,
        GESTURE_INTERVAL_MS,
        ConfigUpdate::from(config_manager.get()),
        callbacks,
    );

    tokio::select! {
        _ = run_load_profile(&mut monitor) => {
            info!("Load profile finished");
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received Ctrl+C"),
                Err(e) => error!("Signal handler error: {}", e),
            }
        }
    }

    let stats = monitor.stats();
    info!(
        average_fps = monitor.average_fps(),
        windows = stats.windows_completed,
        degradations = stats.auto_degradations,
        restorations = stats.auto_restorations,
        "Demo finished"
    );
    Ok(())
}

/// Drive `monitor` through [`LOAD_PROFILE`] in real time.
async fn run_load_profile(monitor: &mut PerformanceMonitor) {
    let mut was_degraded = monitor.is_degraded();

    for &(fps, seconds) in LOAD_PROFILE {
        info!(fps, seconds, "Entering load phase");
        let mut frames = tokio::time::interval(Duration::from_secs(1) / fps);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for _ in 0..u64::from(fps) * seconds {
            frames.tick().await;
            monitor.tick();

            if monitor.is_degraded() != was_degraded {
                was_degraded = monitor.is_degraded();
                match serde_json::to_string(&monitor.degradation_state()) {
                    Ok(json) => info!(state = %json, "Degradation state changed"),
                    Err(e) => error!("Failed to serialize state: {}", e),
                }
            }
        }
    }
}
