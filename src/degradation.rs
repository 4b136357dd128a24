//! Degradation controller implementing the hysteresis algorithm.
//!
//! This module contains the two-state machine that decides whether the
//! host should run in reduced-load mode, based on sustained FPS patterns.

use crate::config::MonitorConfig;

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegradationPhase {
    /// Full load.
    #[default]
    Normal,
    /// Reduced load: fewer particles, slower gesture polling.
    Degraded,
}

/// State change produced by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Normal -> Degraded (or a forced degradation).
    Degraded,
    /// Degraded -> Normal (or a forced restore).
    Restored,
}

/// Hysteresis controller for load decisions.
///
/// Samples below `fps_threshold` build the low streak, samples above
/// `fps_threshold * 1.5` build the high streak. A streak of
/// `debounce_windows` commits the transition out of the current phase.
#[derive(Debug, Clone, Default)]
pub struct DegradationController {
    phase: DegradationPhase,
    /// Consecutive windows below the degrade threshold.
    low_streak: u32,
    /// Consecutive windows above the restore threshold.
    high_streak: u32,
}

impl DegradationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DegradationPhase {
        self.phase
    }

    pub fn is_degraded(&self) -> bool {
        self.phase == DegradationPhase::Degraded
    }

    pub fn low_streak(&self) -> u32 {
        self.low_streak
    }

    pub fn high_streak(&self) -> u32 {
        self.high_streak
    }

    /// Process one completed-window FPS sample.
    ///
    /// Returns `Some(transition)` when the sample commits a phase change.
    ///
    /// # Algorithm
    /// - FPS < threshold: extend the low streak, clear the high streak
    /// - FPS > threshold * 1.5: extend the high streak, clear the low streak
    /// - Anything in between clears both streaks
    /// - Normal with low streak >= debounce -> Degraded
    /// - Degraded with high streak >= debounce -> Normal
    pub fn evaluate(&mut self, fps: u32, config: &MonitorConfig) -> Option<Transition> {
        let fps = f64::from(fps);

        if fps < config.fps_threshold {
            self.low_streak = self.low_streak.saturating_add(1);
            self.high_streak = 0;
        } else if fps > config.restore_threshold() {
            self.high_streak = self.high_streak.saturating_add(1);
            self.low_streak = 0;
        } else {
            self.low_streak = 0;
            self.high_streak = 0;
        }

        match self.phase {
            DegradationPhase::Normal if self.low_streak >= config.debounce_windows => {
                Some(self.enter(DegradationPhase::Degraded))
            }
            DegradationPhase::Degraded if self.high_streak >= config.debounce_windows => {
                Some(self.enter(DegradationPhase::Normal))
            }
            _ => None,
        }
    }

    /// Enter the degraded phase immediately, bypassing the debounce.
    pub fn force_degradation(&mut self) -> Transition {
        self.enter(DegradationPhase::Degraded)
    }

    /// Return to the normal phase immediately, bypassing the debounce.
    pub fn force_restore(&mut self) -> Transition {
        self.enter(DegradationPhase::Normal)
    }

    /// Back to `Normal` with both streaks cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn enter(&mut self, phase: DegradationPhase) -> Transition {
        self.phase = phase;
        self.low_streak = 0;
        self.high_streak = 0;
        match phase {
            DegradationPhase::Degraded => Transition::Degraded,
            DegradationPhase::Normal => Transition::Restored,
        }
    }
}
