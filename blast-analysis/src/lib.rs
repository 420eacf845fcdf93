//! Blast-beat analysis
//!
//! Finds sustained blast-beat sections in an isolated drum track: picks the
//! track's characteristic bass drum and snare frequencies, labels fixed-size
//! windows by peak presence, and merges qualifying runs into intervals.

mod buffer;
mod characteristic;
mod detector;
mod error;
mod labeler;
mod merger;
mod params;
mod peak;
mod spectrum;

pub use buffer::AudioBuffer;
pub use characteristic::{
    identify_frequencies, strongest_frequency_in, CharacteristicFrequencies, FrequencyRange,
    SpectrumObserver,
};
pub use detector::{BlastBeatDetector, DetectionResult, TimeInterval};
pub use error::AnalysisError;
pub use labeler::{window_bounds, LabeledSection, WindowLabeler};
pub use merger::{merge_blast_beats, BlastBeatInterval};
pub use params::{step_size_in_samples, DetectionParams};
pub use peak::PeakDetector;
pub use spectrum::{compute_spectrum, Spectrum, SpectrumTransform};
