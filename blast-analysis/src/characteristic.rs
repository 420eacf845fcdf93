//! Per-track characteristic bass drum and snare frequencies
//!
//! One spectrum over the whole drum track; within each configured range the
//! strongest bin wins.

use crate::buffer::AudioBuffer;
use crate::error::AnalysisError;
use crate::spectrum::{Spectrum, SpectrumTransform};
use tracing::{info, warn};

/// Closed frequency interval in Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyRange {
    pub low: f32,
    pub high: f32,
}

impl FrequencyRange {
    /// Create a range, rejecting `low > high`
    pub fn new(low: f32, high: f32) -> Result<Self, AnalysisError> {
        let range = Self { low, high };
        range.validate("frequency")?;
        Ok(range)
    }

    /// Check that both bounds are finite and ordered
    pub fn validate(&self, label: &str) -> Result<(), AnalysisError> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low > self.high {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} range [{}, {}] is malformed",
                label, self.low, self.high
            )));
        }
        Ok(())
    }

    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.low && freq <= self.high
    }
}

/// Dominant bass drum and snare frequencies of a track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicFrequencies {
    pub bass_drum: f32,
    pub snare: f32,
}

/// Receives the full-track spectrum after identification
///
/// Used for diagnostics such as plotting.
pub trait SpectrumObserver {
    fn on_track_spectrum(
        &self,
        spectrum: &Spectrum,
        frequencies: &CharacteristicFrequencies,
        bass_drum_range: FrequencyRange,
        snare_range: FrequencyRange,
    );
}

/// Frequency of the strongest bin in `range`
///
/// Ties go to the lowest frequency.
pub fn strongest_frequency_in(spectrum: &Spectrum, range: FrequencyRange) -> Option<f32> {
    let mut best: Option<(f32, f32)> = None;
    for (freq, magnitude) in spectrum.bins_between(range.low, range.high) {
        match best {
            Some((_, best_magnitude)) if magnitude <= best_magnitude => {}
            _ => best = Some((freq, magnitude)),
        }
    }
    best.map(|(freq, _)| freq)
}

/// Identify the characteristic frequencies of a drum track
///
/// Fails if either range selects no bins; no partial result is returned.
pub fn identify_frequencies(
    track: &AudioBuffer,
    bass_drum_range: FrequencyRange,
    snare_range: FrequencyRange,
    observer: Option<&dyn SpectrumObserver>,
) -> Result<CharacteristicFrequencies, AnalysisError> {
    let spectrum = SpectrumTransform::new().compute(&track.samples, track.sample_rate);

    let bass_drum = strongest_frequency_in(&spectrum, bass_drum_range);
    if bass_drum.is_none() {
        warn!(
            low = bass_drum_range.low,
            high = bass_drum_range.high,
            "No bass drum frequency found in range"
        );
    }
    let snare = strongest_frequency_in(&spectrum, snare_range);
    if snare.is_none() {
        warn!(
            low = snare_range.low,
            high = snare_range.high,
            "No snare frequency found in range"
        );
    }

    let bass_drum = bass_drum.ok_or(AnalysisError::UnresolvableFrequency {
        instrument: "bass drum",
        low: bass_drum_range.low,
        high: bass_drum_range.high,
    })?;
    let snare = snare.ok_or(AnalysisError::UnresolvableFrequency {
        instrument: "snare",
        low: snare_range.low,
        high: snare_range.high,
    })?;

    let frequencies = CharacteristicFrequencies { bass_drum, snare };
    info!(
        bass_drum_hz = bass_drum,
        snare_hz = snare,
        "Estimated characteristic frequencies"
    );

    if let Some(observer) = observer {
        observer.on_track_spectrum(&spectrum, &frequencies, bass_drum_range, snare_range);
    }

    Ok(frequencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::f32::consts::PI;

    fn two_tone(bass: f32, snare: f32, sample_rate: u32, len: usize) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * bass * t).sin() + 0.5 * (2.0 * PI * snare * t).sin()
            })
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    fn default_ranges() -> (FrequencyRange, FrequencyRange) {
        (
            FrequencyRange::new(10.0, 100.0).unwrap(),
            FrequencyRange::new(170.0, 600.0).unwrap(),
        )
    }

    #[test]
    fn test_identifies_dominant_tones() {
        let track = two_tone(60.0, 300.0, 1000, 1000);
        let (bass, snare) = default_ranges();

        let freqs = identify_frequencies(&track, bass, snare, None).unwrap();
        assert!((freqs.bass_drum - 60.0).abs() < 1e-3);
        assert!((freqs.snare - 300.0).abs() < 1e-3);
        assert!(bass.contains(freqs.bass_drum));
        assert!(snare.contains(freqs.snare));
    }

    #[test]
    fn test_idempotent() {
        let track = two_tone(45.0, 220.0, 1000, 2000);
        let (bass, snare) = default_ranges();

        let first = identify_frequencies(&track, bass, snare, None).unwrap();
        let second = identify_frequencies(&track, bass, snare, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_range_fails() {
        // 100 Hz sample rate: highest bin is below 50 Hz, snare range is unreachable
        let track = AudioBuffer::new(vec![0.1; 100], 100);
        let (bass, snare) = default_ranges();

        let err = identify_frequencies(&track, bass, snare, None).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnresolvableFrequency {
                instrument: "snare",
                low: 170.0,
                high: 600.0,
            }
        );
    }

    #[test]
    fn test_tie_goes_to_lowest_frequency() {
        let spectrum = Spectrum {
            frequencies: vec![0.0, 10.0, 20.0, 30.0, 40.0],
            magnitudes: vec![9.0, 5.0, 7.0, 7.0, 1.0],
        };
        let range = FrequencyRange::new(10.0, 40.0).unwrap();
        assert_eq!(strongest_frequency_in(&spectrum, range), Some(20.0));
    }

    #[test]
    fn test_malformed_range() {
        assert!(FrequencyRange::new(100.0, 10.0).is_err());
        assert!(FrequencyRange::new(f32::NAN, 10.0).is_err());
        assert!(FrequencyRange::new(50.0, 50.0).is_ok());
    }

    struct Recorder {
        seen: RefCell<Vec<CharacteristicFrequencies>>,
    }

    impl SpectrumObserver for Recorder {
        fn on_track_spectrum(
            &self,
            spectrum: &Spectrum,
            frequencies: &CharacteristicFrequencies,
            _bass_drum_range: FrequencyRange,
            _snare_range: FrequencyRange,
        ) {
            assert!(!spectrum.is_empty());
            self.seen.borrow_mut().push(*frequencies);
        }
    }

    #[test]
    fn test_observer_receives_result() {
        let track = two_tone(60.0, 300.0, 1000, 1000);
        let (bass, snare) = default_ranges();
        let recorder = Recorder {
            seen: RefCell::new(Vec::new()),
        };

        let freqs = identify_frequencies(&track, bass, snare, Some(&recorder)).unwrap();
        assert_eq!(recorder.seen.borrow().as_slice(), &[freqs]);
    }
}
