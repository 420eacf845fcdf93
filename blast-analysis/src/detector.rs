//! End-to-end blast-beat detection on a drum track

use crate::buffer::AudioBuffer;
use crate::characteristic::{identify_frequencies, CharacteristicFrequencies, SpectrumObserver};
use crate::error::AnalysisError;
use crate::labeler::{LabeledSection, WindowLabeler};
use crate::merger::{merge_blast_beats, BlastBeatInterval};
use crate::params::DetectionParams;
use crate::peak::PeakDetector;
use tracing::info;

/// Blast-beat section in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInterval {
    pub start_time: f64,
    /// Time of the last sample inside the interval
    pub end_time: f64,
}

/// Everything a detection run produced for one track
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub frequencies: CharacteristicFrequencies,
    pub sections: Vec<LabeledSection>,
    pub intervals: Vec<BlastBeatInterval>,
    pub sample_rate: u32,
}

impl DetectionResult {
    /// Intervals converted to seconds
    pub fn time_intervals(&self) -> Vec<TimeInterval> {
        let rate = self.sample_rate as f64;
        self.intervals
            .iter()
            .map(|interval| TimeInterval {
                start_time: interval.start_index as f64 / rate,
                end_time: interval.end_index.saturating_sub(1) as f64 / rate,
            })
            .collect()
    }
}

/// Runs frequency identification, window labeling and interval merging
pub struct BlastBeatDetector {
    params: DetectionParams,
}

impl BlastBeatDetector {
    /// Create a detector, rejecting invalid parameters up front
    pub fn new(params: DetectionParams) -> Result<Self, AnalysisError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Detect blast beats in an isolated drum track
    pub fn detect(&self, track: &AudioBuffer) -> Result<DetectionResult, AnalysisError> {
        self.detect_observed(track, None)
    }

    /// Detect, handing the full-track spectrum to `observer`
    pub fn detect_observed(
        &self,
        track: &AudioBuffer,
        observer: Option<&dyn SpectrumObserver>,
    ) -> Result<DetectionResult, AnalysisError> {
        if track.sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample rate must be positive".into(),
            ));
        }

        let frequencies = identify_frequencies(
            track,
            self.params.bass_drum_range,
            self.params.snare_range,
            observer,
        )?;

        let detector = PeakDetector::new(
            self.params.peak_detection_band_width,
            self.params.peak_detection_min_area_threshold,
        );
        let sections = WindowLabeler::new(frequencies, self.params.step_size_in_seconds, detector)
            .with_threads(self.params.threads)
            .label(track)?;

        let intervals = merge_blast_beats(&sections, self.params.min_consecutive_hits);
        info!(
            windows = sections.len(),
            blast_beats = intervals.len(),
            "Identified blast beats"
        );

        Ok(DetectionResult {
            frequencies,
            sections,
            intervals,
            sample_rate: track.sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::FrequencyRange;
    use std::f32::consts::PI;

    const RATE: u32 = 1000;

    /// 1s silence, 2s of 60 Hz + 300 Hz, 1s silence
    fn blast_track() -> AudioBuffer {
        let samples = (0..4000)
            .map(|i| {
                if (1000..3000).contains(&i) {
                    let t = i as f32 / RATE as f32;
                    (2.0 * PI * 60.0 * t).sin() + (2.0 * PI * 300.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect();
        AudioBuffer::new(samples, RATE)
    }

    fn params() -> DetectionParams {
        DetectionParams {
            step_size_in_seconds: 0.1,
            ..DetectionParams::default()
        }
    }

    #[test]
    fn test_detects_blast_section() {
        let detector = BlastBeatDetector::new(params()).unwrap();
        let result = detector.detect(&blast_track()).unwrap();

        assert!((result.frequencies.bass_drum - 60.0).abs() < 0.5);
        assert!((result.frequencies.snare - 300.0).abs() < 0.5);
        assert_eq!(result.sections.len(), 40);

        // 20 qualifying windows starting at window 10 restart every 8 windows
        assert_eq!(
            result.intervals,
            vec![
                BlastBeatInterval::new(1000, 1800),
                BlastBeatInterval::new(1800, 2600),
            ]
        );

        let times = result.time_intervals();
        assert_eq!(times.len(), 2);
        assert!((times[0].start_time - 1.0).abs() < 1e-9);
        assert!((times[0].end_time - 1.799).abs() < 1e-9);
        assert!((times[1].start_time - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_detection_matches() {
        let sequential = BlastBeatDetector::new(params()).unwrap();
        let parallel = BlastBeatDetector::new(DetectionParams {
            threads: 4,
            ..params()
        })
        .unwrap();

        let track = blast_track();
        let a = sequential.detect(&track).unwrap();
        let b = parallel.detect(&track).unwrap();
        assert_eq!(a.sections, b.sections);
        assert_eq!(a.intervals, b.intervals);
    }

    #[test]
    fn test_silence_has_no_blast_beats() {
        let detector = BlastBeatDetector::new(params()).unwrap();
        let result = detector
            .detect(&AudioBuffer::new(vec![0.0; 4000], RATE))
            .unwrap();
        assert!(result.intervals.is_empty());
        assert!(result.sections.iter().all(|s| !s.qualifies()));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = DetectionParams {
            bass_drum_range: FrequencyRange {
                low: 100.0,
                high: 10.0,
            },
            ..DetectionParams::default()
        };
        assert!(matches!(
            BlastBeatDetector::new(bad),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unresolvable_frequency_propagates() {
        let detector = BlastBeatDetector::new(params()).unwrap();
        let err = detector
            .detect(&AudioBuffer::new(vec![0.0; 300], 300))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnresolvableFrequency {
                instrument: "snare",
                ..
            }
        ));
    }
}
