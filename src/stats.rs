//! Transition counters for the monitor.
//!
//! Tracks how often the controller changed phase and why. Counters live
//! only as long as the monitor that owns them.

use crate::degradation::Transition;
use serde::{Deserialize, Serialize};

/// Snapshot of transition counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStats {
    /// Completed FPS windows observed while enabled
    pub windows_completed: u64,
    /// Automatic Normal -> Degraded transitions
    pub auto_degradations: u64,
    /// Automatic Degraded -> Normal transitions
    pub auto_restorations: u64,
    /// `force_degradation` calls
    pub forced_degradations: u64,
    /// `force_restore` calls
    pub forced_restorations: u64,
}

impl TransitionStats {
    pub fn record_window(&mut self) {
        self.windows_completed += 1;
    }

    pub fn record_transition(&mut self, transition: Transition, forced: bool) {
        let counter = match (transition, forced) {
            (Transition::Degraded, false) => &mut self.auto_degradations,
            (Transition::Restored, false) => &mut self.auto_restorations,
            (Transition::Degraded, true) => &mut self.forced_degradations,
            (Transition::Restored, true) => &mut self.forced_restorations,
        };
        *counter += 1;
    }

    /// All transitions, automatic and forced.
    pub fn total_transitions(&self) -> u64 {
        self.auto_degradations
            + self.auto_restorations
            + self.forced_degradations
            + self.forced_restorations
    }
}
