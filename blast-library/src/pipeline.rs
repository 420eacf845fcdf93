//! Per-track processing pipeline
//!
//! Resolves the source, isolates drums, decodes, detects and exports. Each
//! track is independent: in a batch, one failure is logged and the rest
//! still run.

use crate::cache::{ArtifactKind, ArtifactStore, CacheError};
use crate::loader::{LoadError, TrackLoader};
use crate::manifest::ManifestEntry;
use crate::report::{ReportError, ReportSink, SpectrumDumpWriter, TrackReport};
use crate::separation::{DrumSeparator, SeparationError};
use crate::source::{file_key, Downloader, SourceError, TrackSource};
use blast_analysis::{AnalysisError, BlastBeatDetector, DetectionParams, DetectionResult};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that abort processing of one track
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Drum separation error: {0}")]
    Separation(#[from] SeparationError),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Outcome of a successfully processed track
#[derive(Debug)]
pub struct ProcessedTrack {
    pub source_path: PathBuf,
    pub drum_track: PathBuf,
    pub result: DetectionResult,
    pub report_path: PathBuf,
}

/// Counts from a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Pipeline options
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Ignore cached downloads and drum stems
    pub refresh: bool,
    /// Write the full-track spectrum next to each report
    pub spectrum_dump_dir: Option<PathBuf>,
}

/// Wires collaborators around the detector
pub struct TrackProcessor {
    base_params: DetectionParams,
    loader: TrackLoader,
    downloader: Box<dyn Downloader>,
    separator: Box<dyn DrumSeparator>,
    store: Box<dyn ArtifactStore>,
    sink: Box<dyn ReportSink>,
    options: ProcessorOptions,
}

impl TrackProcessor {
    pub fn new(
        base_params: DetectionParams,
        loader: TrackLoader,
        downloader: Box<dyn Downloader>,
        separator: Box<dyn DrumSeparator>,
        store: Box<dyn ArtifactStore>,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        Self {
            base_params,
            loader,
            downloader,
            separator,
            store,
            sink,
            options: ProcessorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProcessorOptions) -> Self {
        self.options = options;
        self
    }

    /// Process one track
    pub fn process(&self, entry: &ManifestEntry) -> Result<ProcessedTrack, PipelineError> {
        let params = entry.overrides.apply(&self.base_params);
        // Reject bad parameters before any download or separation work
        let detector = BlastBeatDetector::new(params)?;

        let source_path = self.resolve_source(&entry.source)?;
        let drum_track = self.isolate_drums(&source_path)?;

        let loaded = self.loader.load(&drum_track)?;
        info!(
            track = %loaded.metadata.title,
            duration_secs = loaded.metadata.duration_secs,
            "Identifying blast beats"
        );

        let title = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| loaded.metadata.title.clone());

        let result = match &self.options.spectrum_dump_dir {
            Some(dir) => {
                let dump = SpectrumDumpWriter::for_track(dir, &title);
                detector.detect_observed(&loaded.buffer, Some(&dump))?
            }
            None => detector.detect(&loaded.buffer)?,
        };

        let report = TrackReport::new(title, source_path.clone(), drum_track.clone(), &result);
        let report_path = self.sink.publish(&report)?;

        Ok(ProcessedTrack {
            source_path,
            drum_track,
            result,
            report_path,
        })
    }

    /// Process every entry; failures are logged and counted
    pub fn process_batch(&self, entries: &[ManifestEntry]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (i, entry) in entries.iter().enumerate() {
            info!(
                current = i + 1,
                total = entries.len(),
                source = %entry.source,
                "Processing track"
            );
            match self.process(entry) {
                Ok(track) => {
                    info!(
                        source = %entry.source,
                        blast_beats = track.result.intervals.len(),
                        "Track done"
                    );
                    summary.succeeded += 1;
                }
                Err(e) => {
                    warn!(source = %entry.source, error = %e, "Skipping track");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Local path of the source audio, downloading if needed
    fn resolve_source(&self, source: &TrackSource) -> Result<PathBuf, PipelineError> {
        match source {
            TrackSource::Local(path) => {
                if !path.exists() {
                    return Err(SourceError::NotFound(path.clone()).into());
                }
                Ok(path.clone())
            }
            TrackSource::Remote(url) => {
                let key = source.cache_key()?;
                if !self.options.refresh {
                    if let Some(path) = self.store.lookup(&key, ArtifactKind::Download) {
                        info!(url = %url, "Using cached download");
                        return Ok(path);
                    }
                }
                let path = self.downloader.download(url)?;
                self.store.record(&key, ArtifactKind::Download, &path)?;
                Ok(path)
            }
        }
    }

    /// Drum stem for `source_path`, from cache or the separator
    ///
    /// The key includes the separator id so a passthrough entry never
    /// answers for a real separation, or the other way round.
    fn isolate_drums(&self, source_path: &Path) -> Result<PathBuf, PipelineError> {
        let key = format!("{}|{}", file_key(source_path)?, self.separator.id());
        if !self.options.refresh {
            if let Some(path) = self.store.lookup(&key, ArtifactKind::DrumStem) {
                info!(path = %path.display(), "Using cached drum track");
                return Ok(path);
            }
        }
        let stem = self.separator.separate(source_path)?;
        self.store.record(&key, ArtifactKind::DrumStem, &stem)?;
        Ok(stem)
    }
}
