//! blastbeat - blast-beat detection
//!
//! Finds sustained blast-beat sections in songs from local files, YouTube
//! URLs or a CSV batch manifest.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use blast_library::{
    load_manifest, Config, DemucsSeparator, DrumSeparator, JsonReportWriter, ManifestEntry,
    PassthroughSeparator, ProcessorOptions, SqliteArtifactCache, TrackLoader, TrackProcessor,
    TrackSource, YtDlpDownloader,
};

#[derive(Parser)]
#[command(name = "blastbeat")]
#[command(about = "Detects sustained blast-beat sections in recorded songs")]
#[command(group(ArgGroup::new("input").required(true).args(["file", "url", "batch"])))]
struct Args {
    /// Local audio file to analyze
    #[arg(long)]
    file: Option<PathBuf>,

    /// YouTube URL to download and analyze
    #[arg(long)]
    url: Option<String>,

    /// CSV manifest with a `src` column and optional parameter overrides
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for JSON reports
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Inputs are already isolated drum tracks
    #[arg(long)]
    isolated: bool,

    /// Ignore cached downloads and drum tracks
    #[arg(long)]
    refresh: bool,

    /// Worker threads for window labeling
    #[arg(long)]
    threads: Option<usize>,

    /// Also write the full-track spectrum for plotting
    #[arg(long)]
    debug_spectrum: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(threads) = args.threads {
        config.detection.threads = threads;
    }

    let processor = build_processor(&config, &args)?;

    if let Some(manifest) = &args.batch {
        let entries = load_manifest(manifest)
            .with_context(|| format!("reading manifest {}", manifest.display()))?;
        let summary = processor.process_batch(&entries);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch finished"
        );
        if summary.succeeded == 0 && summary.failed > 0 {
            bail!("all {} tracks failed", summary.failed);
        }
        return Ok(());
    }

    let source = match (&args.file, &args.url) {
        (Some(path), _) => TrackSource::Local(path.clone()),
        (None, Some(url)) => TrackSource::Remote(url.clone()),
        (None, None) => bail!("provide --file, --url or --batch"),
    };

    let track = processor
        .process(&ManifestEntry::new(source.clone()))
        .with_context(|| format!("processing {}", source))?;

    for interval in track.result.time_intervals() {
        info!(
            start = %format_time(interval.start_time),
            end = %format_time(interval.end_time),
            "Blast beat"
        );
    }
    info!(report = %track.report_path.display(), "Done");

    Ok(())
}

fn build_processor(config: &Config, args: &Args) -> anyhow::Result<TrackProcessor> {
    let cache_path = SqliteArtifactCache::default_path();
    let cache = SqliteArtifactCache::open(&cache_path)
        .with_context(|| format!("opening cache {}", cache_path.display()))?;

    let separator: Box<dyn DrumSeparator> = if args.isolated {
        Box::new(PassthroughSeparator)
    } else {
        Box::new(DemucsSeparator::new(config.demucs_device.clone()))
    };

    let options = ProcessorOptions {
        refresh: args.refresh,
        spectrum_dump_dir: args.debug_spectrum.then(|| config.output_dir.clone()),
    };

    Ok(TrackProcessor::new(
        config.detection,
        TrackLoader::with_sample_rate(config.target_sample_rate),
        Box::new(YtDlpDownloader::new(config.work_dir.clone())),
        separator,
        Box::new(cache),
        Box::new(JsonReportWriter::new(config.output_dir.clone())),
    )
    .with_options(options))
}

/// `m:ss.mmm`
fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    format!("{}:{:06.3}", minutes as u64, seconds - minutes * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_one_input_required() {
        assert!(Args::try_parse_from(["blastbeat"]).is_err());
        assert!(Args::try_parse_from(["blastbeat", "--file", "a.mp3", "--url", "x"]).is_err());

        let args = Args::try_parse_from(["blastbeat", "--batch", "songs.csv", "--isolated"]).unwrap();
        assert_eq!(args.batch, Some(PathBuf::from("songs.csv")));
        assert!(args.isolated);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00.000");
        assert_eq!(format_time(75.5), "1:15.500");
    }
}
