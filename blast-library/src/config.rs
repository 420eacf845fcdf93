//! Configuration file for blastbeat
//!
//! Simple `key=value` text with `#` comments. Holds the detection defaults
//! and where outputs and downloads go.

use crate::loader::DEFAULT_SAMPLE_RATE;
use blast_analysis::{DetectionParams, FrequencyRange};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Detection defaults, overridable per manifest row
    pub detection: DetectionParams,
    /// Where JSON reports are written
    pub output_dir: PathBuf,
    /// Where downloaded audio is stored
    pub work_dir: PathBuf,
    /// Device passed to the drum separator
    pub demucs_device: String,
    /// Sample rate tracks are resampled to before analysis
    pub target_sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detection: DetectionParams::default(),
            output_dir: PathBuf::from("output"),
            work_dir: PathBuf::from("tmp"),
            demucs_device: "cuda".to_string(),
            target_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blastbeat")
            .join("config.txt")
    }

    /// Parse config from simple key=value format
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        let mut bass = (None, None);
        let mut snare = (None, None);

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                warn!(line, "Ignoring malformed config line");
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let d = &mut config.detection;

            let parsed = match key {
                "peak_detection_band_width" => set(&mut d.peak_detection_band_width, value),
                "peak_detection_min_area_threshold" => {
                    set(&mut d.peak_detection_min_area_threshold, value)
                }
                "step_size_in_seconds" => set(&mut d.step_size_in_seconds, value),
                "min_consecutive_hits" => set(&mut d.min_consecutive_hits, value),
                "threads" => set(&mut d.threads, value),
                "bass_drum_range_start" => set_opt(&mut bass.0, value),
                "bass_drum_range_end" => set_opt(&mut bass.1, value),
                "snare_drum_range_start" => set_opt(&mut snare.0, value),
                "snare_drum_range_end" => set_opt(&mut snare.1, value),
                "target_sample_rate" => set(&mut config.target_sample_rate, value),
                "output_dir" => set_path(&mut config.output_dir, value),
                "work_dir" => set_path(&mut config.work_dir, value),
                "demucs_device" => {
                    if !value.is_empty() {
                        config.demucs_device = value.to_string();
                    }
                    true
                }
                _ => {
                    warn!(key, "Ignoring unknown config key");
                    true
                }
            };
            if !parsed {
                warn!(key, value, "Ignoring unparsable config value");
            }
        }

        if let (Some(low), Some(high)) = bass {
            config.detection.bass_drum_range = FrequencyRange { low, high };
        }
        if let (Some(low), Some(high)) = snare {
            config.detection.snare_range = FrequencyRange { low, high };
        }

        config
    }

    /// Serialize config to simple key=value format
    pub fn serialize(&self) -> String {
        let d = &self.detection;
        let lines = [
            "# blastbeat configuration".to_string(),
            format!("peak_detection_band_width={}", d.peak_detection_band_width),
            format!(
                "peak_detection_min_area_threshold={}",
                d.peak_detection_min_area_threshold
            ),
            format!("step_size_in_seconds={}", d.step_size_in_seconds),
            format!("bass_drum_range_start={}", d.bass_drum_range.low),
            format!("bass_drum_range_end={}", d.bass_drum_range.high),
            format!("snare_drum_range_start={}", d.snare_range.low),
            format!("snare_drum_range_end={}", d.snare_range.high),
            format!("min_consecutive_hits={}", d.min_consecutive_hits),
            format!("threads={}", d.threads),
            format!("target_sample_rate={}", self.target_sample_rate),
            format!("output_dir={}", self.output_dir.display()),
            format!("work_dir={}", self.work_dir.display()),
            format!("demucs_device={}", self.demucs_device),
        ];
        lines.join("\n")
    }
}

fn set<T: std::str::FromStr>(slot: &mut T, value: &str) -> bool {
    match value.parse() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}

fn set_opt<T: std::str::FromStr>(slot: &mut Option<T>, value: &str) -> bool {
    match value.parse() {
        Ok(v) => {
            *slot = Some(v);
            true
        }
        Err(_) => false,
    }
}

fn set_path(slot: &mut PathBuf, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    *slot = PathBuf::from(value);
    true
}
