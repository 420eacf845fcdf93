//! Fixed-window percussion labeling
//!
//! Splits a track into contiguous, non-overlapping windows and records, for
//! each window, whether the bass drum and snare peaks are present.

use crate::buffer::AudioBuffer;
use crate::characteristic::CharacteristicFrequencies;
use crate::error::AnalysisError;
use crate::params::step_size_in_samples;
use crate::peak::PeakDetector;
use crate::spectrum::SpectrumTransform;
use std::ops::Range;
use std::thread;
use tracing::debug;

/// One labeled window `[start_index, end_index)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabeledSection {
    pub start_index: usize,
    pub end_index: usize,
    pub snare_present: bool,
    pub bass_drum_present: bool,
}

impl LabeledSection {
    pub fn new(
        start_index: usize,
        end_index: usize,
        snare_present: bool,
        bass_drum_present: bool,
    ) -> Self {
        Self {
            start_index,
            end_index,
            snare_present,
            bass_drum_present,
        }
    }

    /// Both peaks present
    pub fn qualifies(&self) -> bool {
        self.snare_present && self.bass_drum_present
    }
}

/// Window boundaries covering `[0, len)` in steps of `step`
///
/// The last window is shortened to end at `len`.
pub fn window_bounds(len: usize, step: usize) -> Vec<Range<usize>> {
    if step == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(step)
        .map(|start| start..(start + step).min(len))
        .collect()
}

/// Labels windows of a track against its characteristic frequencies
pub struct WindowLabeler {
    frequencies: CharacteristicFrequencies,
    detector: PeakDetector,
    step_size_in_seconds: f32,
    threads: usize,
}

impl WindowLabeler {
    /// Create a sequential labeler
    pub fn new(
        frequencies: CharacteristicFrequencies,
        step_size_in_seconds: f32,
        detector: PeakDetector,
    ) -> Self {
        Self {
            frequencies,
            detector,
            step_size_in_seconds,
            threads: 1,
        }
    }

    /// Spread windows over `threads` workers (minimum 1)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Label every window of `track` in track order
    pub fn label(&self, track: &AudioBuffer) -> Result<Vec<LabeledSection>, AnalysisError> {
        let step = step_size_in_samples(self.step_size_in_seconds, track.sample_rate)?;
        let bounds = window_bounds(track.len(), step);

        let sections = if self.threads <= 1 || bounds.len() < 2 {
            self.label_windows(track, &bounds)
        } else {
            self.label_parallel(track, &bounds)
        };

        debug!(
            windows = sections.len(),
            step_samples = step,
            qualifying = sections.iter().filter(|s| s.qualifies()).count(),
            "Labeled track windows"
        );

        Ok(sections)
    }

    fn label_windows(&self, track: &AudioBuffer, bounds: &[Range<usize>]) -> Vec<LabeledSection> {
        let mut transform = SpectrumTransform::new();
        bounds
            .iter()
            .map(|window| {
                let spectrum =
                    transform.compute(&track.samples[window.clone()], track.sample_rate);
                LabeledSection::new(
                    window.start,
                    window.end,
                    self.detector.is_present(self.frequencies.snare, &spectrum),
                    self.detector.is_present(self.frequencies.bass_drum, &spectrum),
                )
            })
            .collect()
    }

    /// Contiguous chunks per worker, joined back in chunk order
    fn label_parallel(&self, track: &AudioBuffer, bounds: &[Range<usize>]) -> Vec<LabeledSection> {
        let chunk_len = bounds.len().div_ceil(self.threads);

        thread::scope(|scope| {
            let handles: Vec<_> = bounds
                .chunks(chunk_len)
                .map(|chunk| scope.spawn(move || self.label_windows(track, chunk)))
                .collect();

            let mut sections = Vec::with_capacity(bounds.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => sections.extend(chunk),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            sections
        })
    }
}
