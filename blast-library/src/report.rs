//! Result export
//!
//! Detection results are written as JSON, one file per track. The
//! full-track spectrum can also be dumped for external plotting.

use blast_analysis::{
    CharacteristicFrequencies, DetectionResult, FrequencyRange, Spectrum, SpectrumObserver,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while writing reports
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One blast-beat section in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlastBeatTime {
    pub start_time: f64,
    pub end_time: f64,
}

/// Exported result for one track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackReport {
    /// File name stem of the source audio
    #[serde(skip)]
    pub title: String,
    pub blast_beats: Vec<BlastBeatTime>,
    pub snare_frequency: f32,
    pub bass_drum_frequency: f32,
    pub source: PathBuf,
    pub drum_track: PathBuf,
}

impl TrackReport {
    pub fn new(
        title: String,
        source: PathBuf,
        drum_track: PathBuf,
        result: &DetectionResult,
    ) -> Self {
        Self {
            title,
            blast_beats: result
                .time_intervals()
                .into_iter()
                .map(|t| BlastBeatTime {
                    start_time: t.start_time,
                    end_time: t.end_time,
                })
                .collect(),
            snare_frequency: result.frequencies.snare,
            bass_drum_frequency: result.frequencies.bass_drum,
            source,
            drum_track,
        }
    }
}

/// Receives finished track reports
pub trait ReportSink {
    /// Publish a report, returning where it went
    fn publish(&self, report: &TrackReport) -> Result<PathBuf, ReportError>;
}

/// Spaces and hyphens become underscores
pub fn sanitize_title(title: &str) -> String {
    title.replace([' ', '-'], "_")
}

/// Writes `<output_dir>/<title>.json`
pub struct JsonReportWriter {
    output_dir: PathBuf,
}

impl JsonReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportSink for JsonReportWriter {
    fn publish(&self, report: &TrackReport) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}.json", sanitize_title(&report.title)));

        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!(path = %path.display(), "Exported results");
        Ok(path)
    }
}

#[derive(Serialize)]
struct SpectrumDump<'a> {
    frequencies: &'a [f32],
    magnitudes: &'a [f32],
    bass_drum_frequency: f32,
    snare_frequency: f32,
    bass_drum_range: [f32; 2],
    snare_range: [f32; 2],
}

/// Dumps the full-track spectrum as JSON for plotting
///
/// Bins above `snare_range.high + 10` Hz are left out.
pub struct SpectrumDumpWriter {
    path: PathBuf,
}

impl SpectrumDumpWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<output_dir>/<title>_spectrum.json`
    pub fn for_track(output_dir: &Path, title: &str) -> Self {
        Self::new(output_dir.join(format!("{}_spectrum.json", sanitize_title(title))))
    }

    fn write(
        &self,
        spectrum: &Spectrum,
        frequencies: &CharacteristicFrequencies,
        bass_drum_range: FrequencyRange,
        snare_range: FrequencyRange,
    ) -> Result<(), ReportError> {
        let limit = snare_range.high + 10.0;
        let shown = spectrum.frequencies.partition_point(|&f| f <= limit);

        let dump = SpectrumDump {
            frequencies: &spectrum.frequencies[..shown],
            magnitudes: &spectrum.magnitudes[..shown],
            bass_drum_frequency: frequencies.bass_drum,
            snare_frequency: frequencies.snare,
            bass_drum_range: [bass_drum_range.low, bass_drum_range.high],
            snare_range: [snare_range.low, snare_range.high],
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(&dump)?)?;
        Ok(())
    }
}

impl SpectrumObserver for SpectrumDumpWriter {
    fn on_track_spectrum(
        &self,
        spectrum: &Spectrum,
        frequencies: &CharacteristicFrequencies,
        bass_drum_range: FrequencyRange,
        snare_range: FrequencyRange,
    ) {
        if let Err(e) = self.write(spectrum, frequencies, bass_drum_range, snare_range) {
            warn!(path = %self.path.display(), error = %e, "Failed to write spectrum dump");
        }
    }
}
