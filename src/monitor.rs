//! Public facade composing the sampler, history and controller.
//!
//! [`PerformanceMonitor`] is driven by the host render loop through
//! [`PerformanceMonitor::update`] and read by collaborating subsystems
//! through [`PerformanceMonitor::degradation_state`].

use crate::config::{ConfigUpdate, MonitorConfig};
use crate::degradation::{DegradationController, Transition};
use crate::fps_history::FpsHistory;
use crate::frame_sampler::FrameSampler;
use crate::stats::TransitionStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Load targets derived from the controller phase.
///
/// Returned by value; each call builds a fresh copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationState {
    pub is_degraded: bool,
    /// Particles the renderer should keep active
    pub current_particle_count: u32,
    pub original_particle_count: u32,
    /// Gesture polling interval the tracker should use, in milliseconds
    pub current_gesture_interval_ms: u64,
    pub original_gesture_interval_ms: u64,
}

/// `original * factor`, rounded half away from zero.
///
/// The factor is not validated. Results outside `0..=u32::MAX` (a
/// negative or huge factor) are clamped to that range, and a NaN
/// factor yields 0.
pub fn reduced_particle_count(original: u32, factor: f64) -> u32 {
    let reduced = (f64::from(original) * factor).round();
    if reduced.is_nan() {
        return 0;
    }
    reduced.clamp(0.0, f64::from(u32::MAX)) as u32
}

type FpsHook = Box<dyn FnMut(u32)>;
type TransitionHook = Box<dyn FnMut()>;

/// Hooks invoked synchronously from inside monitor calls.
///
/// Any subset may be left unset.
#[derive(Default)]
pub struct MonitorCallbacks {
    on_fps_update: Option<FpsHook>,
    on_degradation_triggered: Option<TransitionHook>,
    on_degradation_restored: Option<TransitionHook>,
}

impl MonitorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with each completed window's FPS.
    pub fn on_fps_update(mut self, hook: impl FnMut(u32) + 'static) -> Self {
        self.on_fps_update = Some(Box::new(hook));
        self
    }

    /// Called on every entry into degraded mode, automatic or forced.
    pub fn on_degradation_triggered(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_degradation_triggered = Some(Box::new(hook));
        self
    }

    /// Called on every return to normal mode, automatic or forced.
    pub fn on_degradation_restored(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_degradation_restored = Some(Box::new(hook));
        self
    }

    fn fps_updated(&mut self, fps: u32) {
        if let Some(hook) = self.on_fps_update.as_mut() {
            hook(fps);
        }
    }

    fn transitioned(&mut self, transition: Transition) {
        let hook = match transition {
            Transition::Degraded => self.on_degradation_triggered.as_mut(),
            Transition::Restored => self.on_degradation_restored.as_mut(),
        };
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl fmt::Debug for MonitorCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorCallbacks")
            .field("on_fps_update", &self.on_fps_update.is_some())
            .field("on_degradation_triggered", &self.on_degradation_triggered.is_some())
            .field("on_degradation_restored", &self.on_degradation_restored.is_some())
            .finish()
    }
}

/// Frame-rate monitor and adaptive degradation controller.
#[derive(Debug)]
pub struct PerformanceMonitor {
    config: MonitorConfig,
    sampler: FrameSampler,
    history: FpsHistory,
    controller: DegradationController,
    callbacks: MonitorCallbacks,
    stats: TransitionStats,
    enabled: bool,
    original_particle_count: u32,
    original_gesture_interval_ms: u64,
}

impl PerformanceMonitor {
    /// Create an enabled monitor whose first window opens now.
    ///
    /// `config` is merged over [`MonitorConfig::default`] without
    /// validation.
    pub fn new(
        original_particle_count: u32,
        original_gesture_interval_ms: u64,
        config: ConfigUpdate,
        callbacks: MonitorCallbacks,
    ) -> Self {
        Self {
            config: config.apply(MonitorConfig::default()),
            sampler: FrameSampler::new(),
            history: FpsHistory::new(),
            controller: DegradationController::new(),
            callbacks,
            stats: TransitionStats::default(),
            enabled: true,
            original_particle_count,
            original_gesture_interval_ms,
        }
    }

    /// Open the first measurement window at `start` instead of now.
    pub fn starting_at(mut self, start: Instant) -> Self {
        self.sampler.reset(start);
        self
    }

    /// Count one rendered frame at `now`.
    ///
    /// Must be called once per frame with non-decreasing timestamps. Does
    /// nothing while disabled.
    pub fn update(&mut self, now: Instant) {
        if !self.enabled {
            return;
        }

        let Some(fps) = self.sampler.record_frame(now) else {
            return;
        };

        self.history.record(fps);
        self.stats.record_window();
        debug!(fps, average_fps = self.history.average_fps(), "FPS window completed");
        self.callbacks.fps_updated(fps);

        if let Some(transition) = self.controller.evaluate(fps, &self.config) {
            self.apply_transition(transition, false);
        }
    }

    /// [`update`](Self::update) with the current time.
    pub fn tick(&mut self) {
        self.update(Instant::now());
    }

    /// Enter degraded mode immediately. Always fires the triggered hook.
    pub fn force_degradation(&mut self) {
        let transition = self.controller.force_degradation();
        self.apply_transition(transition, true);
    }

    /// Leave degraded mode immediately. Always fires the restored hook.
    pub fn force_restore(&mut self) {
        let transition = self.controller.force_restore();
        self.apply_transition(transition, true);
    }

    /// Return to normal mode and forget all FPS samples. The next window
    /// opens now.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// [`reset`](Self::reset) with the next window opening at `now`.
    pub fn reset_at(&mut self, now: Instant) {
        self.controller.reset();
        self.history.reset();
        self.sampler.reset(now);
        self.stats = TransitionStats::default();
        info!("Performance monitor reset");
    }

    /// FPS of the last completed window, 60 before the first.
    pub fn fps(&self) -> u32 {
        self.sampler.fps()
    }

    /// Rounded mean of all completed windows, 60 before the first.
    pub fn average_fps(&self) -> u32 {
        self.history.average_fps()
    }

    pub fn history(&self) -> &FpsHistory {
        &self.history
    }

    pub fn is_degraded(&self) -> bool {
        self.controller.is_degraded()
    }

    /// Current load targets for the particle system and gesture tracker.
    pub fn degradation_state(&self) -> DegradationState {
        let is_degraded = self.controller.is_degraded();
        let (current_particle_count, current_gesture_interval_ms) = if is_degraded {
            (
                reduced_particle_count(
                    self.original_particle_count,
                    self.config.particle_reduction_factor,
                ),
                self.config.gesture_detection_interval_ms,
            )
        } else {
            (self.original_particle_count, self.original_gesture_interval_ms)
        };

        DegradationState {
            is_degraded,
            current_particle_count,
            original_particle_count: self.original_particle_count,
            current_gesture_interval_ms,
            original_gesture_interval_ms: self.original_gesture_interval_ms,
        }
    }

    pub fn stats(&self) -> TransitionStats {
        self.stats
    }

    pub fn config(&self) -> MonitorConfig {
        self.config
    }

    /// Overwrite the fields set in `update`; others keep their values.
    pub fn update_config(&mut self, update: ConfigUpdate) {
        self.config = update.apply(self.config);
        info!(
            fps_threshold = self.config.fps_threshold,
            particle_reduction_factor = self.config.particle_reduction_factor,
            gesture_detection_interval_ms = self.config.gesture_detection_interval_ms,
            debounce_windows = self.config.debounce_windows,
            "Monitor configuration updated"
        );
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        info!("Performance monitor enabled");
    }

    /// Freeze the monitor. Readings keep their last values.
    pub fn disable(&mut self) {
        self.enabled = false;
        info!("Performance monitor disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn apply_transition(&mut self, transition: Transition, forced: bool) {
        self.stats.record_transition(transition, forced);
        let state = self.degradation_state();
        match transition {
            Transition::Degraded => info!(
                forced,
                fps = self.fps(),
                particles = state.current_particle_count,
                gesture_interval_ms = state.current_gesture_interval_ms,
                "Degradation triggered"
            ),
            Transition::Restored => info!(
                forced,
                fps = self.fps(),
                particles = state.current_particle_count,
                gesture_interval_ms = state.current_gesture_interval_ms,
                "Degradation restored"
            ),
        }
        self.callbacks.transitioned(transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    const SECOND: Duration = Duration::from_millis(1000);

    /// Drive one window of `fps` frames starting at `start`, the last frame
    /// landing exactly on the window boundary. Returns the window end.
    fn drive_window(monitor: &mut PerformanceMonitor, start: Instant, fps: u32) -> Instant {
        let step = SECOND / fps;
        for i in 1..fps {
            monitor.update(start + step * i);
        }
        let end = start + SECOND;
        monitor.update(end);
        end
    }

    fn drive_windows(
        monitor: &mut PerformanceMonitor,
        mut start: Instant,
        fps: u32,
        windows: u32,
    ) -> Instant {
        for _ in 0..windows {
            start = drive_window(monitor, start, fps);
        }
        start
    }

    #[derive(Default)]
    struct Recorded {
        fps: RefCell<Vec<u32>>,
        triggered: Cell<u32>,
        restored: Cell<u32>,
    }

    fn recording_callbacks(recorded: &Rc<Recorded>) -> MonitorCallbacks {
        let fps_sink = Rc::clone(recorded);
        let triggered = Rc::clone(recorded);
        let restored = Rc::clone(recorded);
        MonitorCallbacks::new()
            .on_fps_update(move |fps| fps_sink.fps.borrow_mut().push(fps))
            .on_degradation_triggered(move || triggered.triggered.set(triggered.triggered.get() + 1))
            .on_degradation_restored(move || restored.restored.set(restored.restored.get() + 1))
    }

    fn monitor_with(threshold: f64, recorded: &Rc<Recorded>, start: Instant) -> PerformanceMonitor {
        PerformanceMonitor::new(
            1000,
            16,
            ConfigUpdate::default().fps_threshold(threshold),
            recording_callbacks(recorded),
        )
        .starting_at(start)
    }

    #[test]
    fn test_initial_readings() {
        let monitor = PerformanceMonitor::new(500, 33, ConfigUpdate::default(), MonitorCallbacks::new());

        assert_eq!(monitor.fps(), 60);
        assert_eq!(monitor.average_fps(), 60);
        assert!(!monitor.is_degraded());
        assert!(monitor.is_enabled());
        assert_eq!(monitor.config(), MonitorConfig::default());

        let state = monitor.degradation_state();
        assert_eq!(state.current_particle_count, 500);
        assert_eq!(state.current_gesture_interval_ms, 33);
    }

    #[test]
    fn test_window_counts_completing_frame() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);

        // 44 frames inside the second, then one at 1000ms
        let step = SECOND / 45;
        for i in 1..=44 {
            monitor.update(start + step * i);
        }
        assert!(recorded.fps.borrow().is_empty());
        monitor.update(start + SECOND);

        assert_eq!(monitor.fps(), 45);
        assert_eq!(*recorded.fps.borrow(), vec![45]);
    }

    #[test]
    fn test_average_over_windows() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(5.0, &recorded, start);

        let t = drive_window(&mut monitor, start, 50);
        let t = drive_window(&mut monitor, t, 40);
        drive_window(&mut monitor, t, 33);

        assert_eq!(monitor.fps(), 33);
        // (50 + 40 + 33) / 3 = 41
        assert_eq!(monitor.average_fps(), 41);
        assert_eq!(monitor.history().len(), 3);
        assert_eq!(monitor.stats().windows_completed, 3);
    }

    #[test]
    fn test_sustained_low_fps_degrades() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);

        drive_windows(&mut monitor, start, 15, 10);

        assert!(monitor.is_degraded());
        assert_eq!(recorded.triggered.get(), 1);
        assert_eq!(recorded.restored.get(), 0);

        let state = monitor.degradation_state();
        assert!(state.is_degraded);
        assert_eq!(state.current_particle_count, 500);
        assert_eq!(state.original_particle_count, 1000);
        assert_eq!(state.current_gesture_interval_ms, 100);
        assert_eq!(state.original_gesture_interval_ms, 16);
        assert_eq!(monitor.stats().auto_degradations, 1);
    }

    #[test]
    fn test_degrades_on_debounce_window() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);

        let t = drive_windows(&mut monitor, start, 15, 2);
        assert!(!monitor.is_degraded());
        drive_window(&mut monitor, t, 15);
        assert!(monitor.is_degraded());
    }

    #[test]
    fn test_sustained_high_fps_restores() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);

        let t = drive_windows(&mut monitor, start, 15, 5);
        assert!(monitor.is_degraded());

        drive_windows(&mut monitor, t, 45, 10);

        assert!(!monitor.is_degraded());
        assert_eq!(recorded.restored.get(), 1);
        let state = monitor.degradation_state();
        assert_eq!(state.current_particle_count, 1000);
        assert_eq!(state.current_gesture_interval_ms, 16);
    }

    #[test]
    fn test_fps_between_thresholds_holds_degraded() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);
        monitor.force_degradation();

        // 25 fps: above the degrade threshold, not above 30
        drive_windows(&mut monitor, start, 25, 10);
        assert!(monitor.is_degraded());
        assert_eq!(recorded.restored.get(), 0);
    }

    #[test]
    fn test_force_degradation_and_restore() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);
        drive_windows(&mut monitor, start, 60, 2);

        monitor.force_degradation();
        assert!(monitor.is_degraded());
        assert_eq!(recorded.triggered.get(), 1);

        // Repeated force still fires
        monitor.force_degradation();
        assert_eq!(recorded.triggered.get(), 2);

        monitor.force_restore();
        assert!(!monitor.is_degraded());
        assert_eq!(recorded.restored.get(), 1);

        monitor.force_restore();
        assert_eq!(recorded.restored.get(), 2);
        assert_eq!(monitor.stats().forced_degradations, 2);
        assert_eq!(monitor.stats().forced_restorations, 2);
    }

    #[test]
    fn test_disable_stops_updates() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);

        let t = drive_window(&mut monitor, start, 30);
        assert_eq!(recorded.fps.borrow().len(), 1);

        monitor.disable();
        assert!(!monitor.is_enabled());
        let t = drive_windows(&mut monitor, t, 10, 5);

        assert_eq!(recorded.fps.borrow().len(), 1);
        assert_eq!(monitor.fps(), 30);
        assert_eq!(monitor.average_fps(), 30);
        assert!(!monitor.is_degraded());

        monitor.enable();
        // Window opened before the disable; the first frame closes it
        monitor.update(t + SECOND);
        assert_eq!(recorded.fps.borrow().len(), 2);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let start = Instant::now();
        let recorded = Rc::new(Recorded::default());
        let mut monitor = monitor_with(20.0, &recorded, start);

        let t = drive_windows(&mut monitor, start, 10, 4);
        assert!(monitor.is_degraded());

        monitor.reset_at(t);
        assert!(!monitor.is_degraded());
        assert_eq!(monitor.fps(), 60);
        assert_eq!(monitor.average_fps(), 60);
        assert_eq!(monitor.stats(), TransitionStats::default());

        let state = monitor.degradation_state();
        assert_eq!(state.original_particle_count, 1000);
        assert_eq!(state.current_particle_count, 1000);

        // Debounce starts over after reset
        let t = drive_windows(&mut monitor, t, 10, 2);
        assert!(!monitor.is_degraded());
        drive_window(&mut monitor, t, 10);
        assert!(monitor.is_degraded());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut monitor = PerformanceMonitor::new(800, 20, ConfigUpdate::default(), MonitorCallbacks::new());

        let mut first = monitor.degradation_state();
        first.current_particle_count = 1;
        first.is_degraded = true;

        let second = monitor.degradation_state();
        assert_eq!(second.current_particle_count, 800);
        assert!(!second.is_degraded);

        monitor.force_degradation();
        assert_ne!(monitor.degradation_state(), second);
    }

    #[test]
    fn test_update_config_merges_fields() {
        let mut monitor = PerformanceMonitor::new(
            1000,
            16,
            ConfigUpdate::default().fps_threshold(20.0),
            MonitorCallbacks::new(),
        );

        monitor.update_config(ConfigUpdate::default().particle_reduction_factor(0.25));
        let config = monitor.config();
        assert_eq!(config.fps_threshold, 20.0);
        assert_eq!(config.particle_reduction_factor, 0.25);
        assert_eq!(config.gesture_detection_interval_ms, 100);

        monitor.force_degradation();
        assert_eq!(monitor.degradation_state().current_particle_count, 250);
    }

    #[test]
    fn test_unvalidated_config_is_applied() {
        let mut monitor = PerformanceMonitor::new(
            10,
            16,
            ConfigUpdate::default()
                .fps_threshold(-5.0)
                .particle_reduction_factor(2.0),
            MonitorCallbacks::new(),
        );

        assert_eq!(monitor.config().fps_threshold, -5.0);
        monitor.force_degradation();
        assert_eq!(monitor.degradation_state().current_particle_count, 20);
    }

    #[test]
    fn test_particle_count_rounds() {
        let mut monitor = PerformanceMonitor::new(
            7,
            16,
            ConfigUpdate::default().particle_reduction_factor(0.5),
            MonitorCallbacks::new(),
        );
        monitor.force_degradation();
        // 3.5 rounds up
        assert_eq!(monitor.degradation_state().current_particle_count, 4);
    }

    #[test]
    fn test_out_of_range_factor_clamps_particle_count() {
        let mut monitor = PerformanceMonitor::new(
            1000,
            16,
            ConfigUpdate::default().particle_reduction_factor(-0.5),
            MonitorCallbacks::new(),
        );
        monitor.force_degradation();

        // Negative factor is applied as given, then clamped at zero
        assert_eq!(monitor.config().particle_reduction_factor, -0.5);
        assert_eq!(monitor.degradation_state().current_particle_count, 0);

        assert_eq!(reduced_particle_count(u32::MAX, 4.0), u32::MAX);
        assert_eq!(reduced_particle_count(100, f64::NAN), 0);
        assert_eq!(reduced_particle_count(100, 0.25), 25);
    }

    #[test]
    fn test_callbacks_are_optional() {
        let start = Instant::now();
        let mut monitor = PerformanceMonitor::new(
            100,
            16,
            ConfigUpdate::default().fps_threshold(20.0).debounce_windows(1),
            MonitorCallbacks::new(),
        )
        .starting_at(start);

        drive_window(&mut monitor, start, 5);
        assert!(monitor.is_degraded());
        monitor.force_restore();
        assert!(!monitor.is_degraded());
    }

    proptest! {
        #[test]
        fn prop_average_matches_window_mean(rates in prop::collection::vec(2u32..=120, 1..8)) {
            let start = Instant::now();
            let recorded = Rc::new(Recorded::default());
            let mut monitor = monitor_with(1.0, &recorded, start);

            let mut t = start;
            for &fps in &rates {
                t = drive_window(&mut monitor, t, fps);
            }

            prop_assert_eq!(recorded.fps.borrow().clone(), rates.clone());
            let mean = rates.iter().map(|&r| r as f64).sum::<f64>() / rates.len() as f64;
            prop_assert_eq!(monitor.average_fps(), mean.round() as u32);
        }
    }
}
