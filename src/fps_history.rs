//! History of completed-window FPS samples.

/// FPS reported before any window has completed.
pub const DEFAULT_FPS: u32 = 60;

/// Append-only record of completed-window FPS values with a running sum.
#[derive(Debug, Clone, Default)]
pub struct FpsHistory {
    samples: Vec<u32>,
    sum: u64,
}

impl FpsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed window's FPS.
    pub fn record(&mut self, fps: u32) {
        self.samples.push(fps);
        self.sum += u64::from(fps);
    }

    /// Mean of all recorded samples, rounded to the nearest whole FPS.
    /// Returns [`DEFAULT_FPS`] if nothing has been recorded.
    pub fn average_fps(&self) -> u32 {
        if self.samples.is_empty() {
            return DEFAULT_FPS;
        }
        (self.sum as f64 / self.samples.len() as f64).round() as u32
    }

    pub fn min(&self) -> Option<u32> {
        self.samples.iter().copied().min()
    }

    pub fn max(&self) -> Option<u32> {
        self.samples.iter().copied().max()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recently recorded sample.
    pub fn latest(&self) -> Option<u32> {
        self.samples.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.iter().copied()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = 0;
    }
}
