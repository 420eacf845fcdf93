//! Detection parameters

use crate::characteristic::FrequencyRange;
use crate::error::AnalysisError;

/// Tunables for a detection run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Half-width in Hz of the band searched around each characteristic frequency
    pub peak_detection_band_width: f32,
    /// Summed in-band magnitude a peak must exceed to count as present
    pub peak_detection_min_area_threshold: f32,
    /// Window duration for labeling
    pub step_size_in_seconds: f32,
    /// Search range for the bass drum frequency
    pub bass_drum_range: FrequencyRange,
    /// Search range for the snare frequency
    pub snare_range: FrequencyRange,
    /// Minimum run of qualifying windows reported as a blast beat
    pub min_consecutive_hits: usize,
    /// Worker threads used for window labeling
    pub threads: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            peak_detection_band_width: 10.0,
            peak_detection_min_area_threshold: 37.6,
            step_size_in_seconds: 0.15,
            bass_drum_range: FrequencyRange {
                low: 10.0,
                high: 100.0,
            },
            snare_range: FrequencyRange {
                low: 170.0,
                high: 600.0,
            },
            min_consecutive_hits: 8,
            threads: 1,
        }
    }
}

impl DetectionParams {
    /// Reject configurations that cannot be processed
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.step_size_in_seconds.is_finite() || self.step_size_in_seconds <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "step size must be positive, got {}",
                self.step_size_in_seconds
            )));
        }
        if !self.peak_detection_band_width.is_finite() || self.peak_detection_band_width < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "band width must be non-negative, got {}",
                self.peak_detection_band_width
            )));
        }
        if !self.peak_detection_min_area_threshold.is_finite()
            || self.peak_detection_min_area_threshold < 0.0
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "area threshold must be non-negative, got {}",
                self.peak_detection_min_area_threshold
            )));
        }
        self.bass_drum_range.validate("bass drum")?;
        self.snare_range.validate("snare")?;
        if self.min_consecutive_hits == 0 {
            return Err(AnalysisError::InvalidConfig(
                "min_consecutive_hits must be at least 1".into(),
            ));
        }
        if self.threads == 0 {
            return Err(AnalysisError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Window length in samples at `sample_rate`
    pub fn step_size_in_samples(&self, sample_rate: u32) -> Result<usize, AnalysisError> {
        step_size_in_samples(self.step_size_in_seconds, sample_rate)
    }
}

/// `floor(step_size_in_seconds * sample_rate)`
///
/// Fails when the step is not positive or shorter than one sample.
pub fn step_size_in_samples(
    step_size_in_seconds: f32,
    sample_rate: u32,
) -> Result<usize, AnalysisError> {
    if !step_size_in_seconds.is_finite() || step_size_in_seconds <= 0.0 {
        return Err(AnalysisError::InvalidConfig(format!(
            "step size must be positive, got {}",
            step_size_in_seconds
        )));
    }
    let samples = (step_size_in_seconds * sample_rate as f32).floor();
    if samples < 1.0 {
        return Err(AnalysisError::InvalidConfig(format!(
            "step of {}s is shorter than one sample at {} Hz",
            step_size_in_seconds, sample_rate
        )));
    }
    Ok(samples as usize)
}
