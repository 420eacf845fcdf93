//! Mono audio buffer

/// Mono samples with their sample rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    /// Samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time in seconds of the sample at `index`
    pub fn time_at(&self, index: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        index as f64 / self.sample_rate as f64
    }

    /// Track duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.time_at(self.samples.len())
    }
}
