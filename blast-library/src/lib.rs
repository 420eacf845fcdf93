//! Track handling for blastbeat - acquisition, drum isolation, loading,
//! caching and result export

mod cache;
mod config;
mod loader;
mod manifest;
mod pipeline;
mod report;
mod separation;
mod source;

#[cfg(test)]
mod test_support;

pub use cache::{ArtifactKind, ArtifactStore, CacheError, SqliteArtifactCache};
pub use config::Config;
pub use loader::{
    downmix, LoadError, LoadedTrack, TrackLoader, TrackMetadata, DEFAULT_SAMPLE_RATE,
};
pub use manifest::{load_manifest, parse_manifest, ManifestEntry, ManifestError, ParamOverrides};
pub use pipeline::{BatchSummary, PipelineError, ProcessedTrack, ProcessorOptions, TrackProcessor};
pub use report::{
    sanitize_title, BlastBeatTime, JsonReportWriter, ReportError, ReportSink, SpectrumDumpWriter,
    TrackReport,
};
pub use separation::{
    drum_stem_path, DemucsSeparator, DrumSeparator, PassthroughSeparator, SeparationError,
};
pub use source::{file_key, is_youtube_url, Downloader, SourceError, TrackSource, YtDlpDownloader};
