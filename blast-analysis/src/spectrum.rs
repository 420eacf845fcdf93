//! One-sided FFT magnitude spectrum

use rustfft::{num_complex::Complex, FftPlanner};

/// Positive-frequency half of a transform
///
/// `frequencies` is strictly increasing and has the same length as
/// `magnitudes`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spectrum {
    /// Bin frequencies in Hz
    pub frequencies: Vec<f32>,
    /// Bin magnitudes (complex modulus, unnormalized)
    pub magnitudes: Vec<f32>,
}

impl Spectrum {
    /// Number of bins
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Iterate `(frequency, magnitude)` pairs in increasing-frequency order
    pub fn bins(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
    }

    /// Iterate the bins whose frequency lies in `[low, high]`
    pub fn bins_between(&self, low: f32, high: f32) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.bins().filter(move |&(f, _)| f >= low && f <= high)
    }
}

/// FFT spectrum transform
///
/// Keeps an `FftPlanner` so repeated calls on equally sized windows reuse
/// the same plan.
pub struct SpectrumTransform {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
}

impl Default for SpectrumTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumTransform {
    /// Create a new transform
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
        }
    }

    /// Compute the one-sided magnitude spectrum of `samples`
    ///
    /// Returns `floor(N/2)` bins. Fewer than two samples give an empty
    /// spectrum.
    pub fn compute(&mut self, samples: &[f32], sample_rate: u32) -> Spectrum {
        let n = samples.len();
        if n < 2 {
            return Spectrum::default();
        }

        self.buffer.clear();
        self.buffer
            .extend(samples.iter().map(|&s| Complex::new(s, 0.0)));

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut self.buffer);

        let half = n / 2;
        let rate = sample_rate as f32;
        let len = n as f32;

        let frequencies = (0..half).map(|k| k as f32 * rate / len).collect();
        let magnitudes = self.buffer[..half].iter().map(|c| c.norm()).collect();

        Spectrum {
            frequencies,
            magnitudes,
        }
    }
}

/// Compute a spectrum with a throwaway planner
pub fn compute_spectrum(samples: &[f32], sample_rate: u32) -> Spectrum {
    SpectrumTransform::new().compute(samples, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_length_is_half_of_input() {
        let spectrum = compute_spectrum(&vec![0.0; 101], 1000);
        assert_eq!(spectrum.len(), 50);
        assert_eq!(spectrum.magnitudes.len(), 50);
    }

    #[test]
    fn test_short_input_is_empty() {
        assert!(compute_spectrum(&[], 1000).is_empty());
        assert!(compute_spectrum(&[0.5], 1000).is_empty());
    }

    #[test]
    fn test_bin_frequencies() {
        let spectrum = compute_spectrum(&vec![0.0; 100], 1000);
        assert_eq!(spectrum.frequencies[0], 0.0);
        assert!((spectrum.frequencies[1] - 10.0).abs() < 1e-4);
        assert!((spectrum.frequencies[49] - 490.0).abs() < 1e-3);
        assert!(spectrum.frequencies.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_sine_peak_location_and_height() {
        // 60 Hz lands exactly on bin 6 of a 100-sample window at 1 kHz
        let samples = sine(60.0, 1.0, 1000, 100);
        let spectrum = compute_spectrum(&samples, 1000);

        let (peak_bin, peak) = spectrum
            .magnitudes
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &m)| if m > acc.1 { (i, m) } else { acc });

        assert_eq!(peak_bin, 6);
        assert!((peak - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_input_not_mutated() {
        let samples = sine(60.0, 1.0, 1000, 64);
        let copy = samples.clone();
        let _ = compute_spectrum(&samples, 1000);
        assert_eq!(samples, copy);
    }

    #[test]
    fn test_transform_reuse_matches_fresh() {
        let mut transform = SpectrumTransform::new();
        let a = sine(120.0, 0.8, 1000, 200);
        let b = sine(250.0, 0.3, 1000, 200);

        let _ = transform.compute(&a, 1000);
        let reused = transform.compute(&b, 1000);
        assert_eq!(reused, compute_spectrum(&b, 1000));
    }

    #[test]
    fn test_bins_between_is_inclusive() {
        let spectrum = compute_spectrum(&vec![0.0; 100], 1000);
        let freqs: Vec<f32> = spectrum.bins_between(50.0, 70.0).map(|(f, _)| f).collect();
        assert_eq!(freqs.len(), 3);
    }
}
