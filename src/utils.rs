/// Incremental (online) mean: updates from each new sample without
/// storing the sample list. O(1) memory.
#[derive(Debug, Clone, Default)]
pub struct RunningMean {
    mean: f64,
    count: u64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one new sample into the mean and return the updated value.
    pub fn update(&mut self, value: f64) -> f64 {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.mean
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
