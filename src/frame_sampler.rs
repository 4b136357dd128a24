//! Frame sampler deriving FPS from the cadence of per-frame calls.
//!
//! The host render loop calls [`FrameSampler::record_frame`] once per
//! rendered frame. Frames are counted inside one-second windows; when a
//! window elapses the count becomes that window's FPS sample.

use crate::fps_history::DEFAULT_FPS;
use std::time::{Duration, Instant};

/// Length of one measurement window.
pub const SAMPLE_WINDOW: Duration = Duration::from_millis(1000);

/// Rolling one-second frame counter.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    /// Start of the current window.
    window_start: Instant,
    /// Frames observed since `window_start`.
    frame_count: u32,
    /// FPS of the most recently completed window.
    fps: u32,
}

impl FrameSampler {
    /// Create a sampler whose first window opens now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a sampler whose first window opens at `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            window_start: start,
            frame_count: 0,
            fps: DEFAULT_FPS,
        }
    }

    /// Count one frame at `now`.
    ///
    /// Returns `Some(fps)` when this frame completes a window. The
    /// completing frame is part of the count. Timestamps earlier than the
    /// window start are counted but never complete a window.
    pub fn record_frame(&mut self, now: Instant) -> Option<u32> {
        self.frame_count = self.frame_count.saturating_add(1);

        if now.saturating_duration_since(self.window_start) >= SAMPLE_WINDOW {
            let fps = self.frame_count;
            self.fps = fps;
            self.window_start = now;
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }

    /// FPS of the last completed window, or 60 before the first one.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Frames counted so far in the open window.
    pub fn pending_frames(&self) -> u32 {
        self.frame_count
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// Restore the default FPS and open a fresh window at `now`.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::starting_at(now);
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}
