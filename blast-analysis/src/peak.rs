//! Band-area peak presence detection

use crate::spectrum::Spectrum;

/// Decides whether a spectrum has a peak around a target frequency
///
/// The magnitudes of every bin inside `[target - band_width, target + band_width]`
/// are summed as a proxy for the area under the curve; a peak is present when
/// that sum strictly exceeds `min_area_threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDetector {
    pub band_width: f32,
    pub min_area_threshold: f32,
}

impl PeakDetector {
    pub fn new(band_width: f32, min_area_threshold: f32) -> Self {
        Self {
            band_width,
            min_area_threshold,
        }
    }

    /// Summed magnitude in the band, or `None` when the band selects no bins
    pub fn band_area(&self, target_freq: f32, spectrum: &Spectrum) -> Option<f32> {
        let low = target_freq - self.band_width;
        let high = target_freq + self.band_width;

        let mut selected = 0usize;
        let mut area = 0.0f32;
        for (_, magnitude) in spectrum.bins_between(low, high) {
            selected += 1;
            area += magnitude;
        }

        (selected > 0).then_some(area)
    }

    /// Check for a peak around `target_freq`
    pub fn is_present(&self, target_freq: f32, spectrum: &Spectrum) -> bool {
        self.band_area(target_freq, spectrum)
            .is_some_and(|area| area > self.min_area_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_spectrum(bin_width: f32, bins: usize, magnitude: f32) -> Spectrum {
        Spectrum {
            frequencies: (0..bins).map(|k| k as f32 * bin_width).collect(),
            magnitudes: vec![magnitude; bins],
        }
    }

    #[test]
    fn test_sum_over_inclusive_band() {
        // Bins at 50, 60, 70 fall in [50, 70]
        let spectrum = flat_spectrum(10.0, 50, 13.0);
        let detector = PeakDetector::new(10.0, 37.6);

        assert_eq!(detector.band_area(60.0, &spectrum), Some(39.0));
        assert!(detector.is_present(60.0, &spectrum));
    }

    #[test]
    fn test_threshold_is_strict() {
        let spectrum = flat_spectrum(10.0, 50, 10.0);
        let detector = PeakDetector::new(10.0, 30.0);
        assert!(!detector.is_present(60.0, &spectrum));
    }

    #[test]
    fn test_empty_band_is_absent() {
        let detector = PeakDetector::new(10.0, 0.0);

        assert!(!detector.is_present(60.0, &Spectrum::default()));

        // Target far above the highest bin
        let spectrum = flat_spectrum(10.0, 5, 100.0);
        assert_eq!(detector.band_area(300.0, &spectrum), None);
        assert!(!detector.is_present(300.0, &spectrum));
    }

    #[test]
    fn test_zero_band_width_selects_exact_bin() {
        let spectrum = flat_spectrum(10.0, 50, 40.0);
        let detector = PeakDetector::new(0.0, 37.6);

        assert!(detector.is_present(60.0, &spectrum));
        assert!(!detector.is_present(65.0, &spectrum));
    }
}
