//! Track sources: local files and remote URLs
//!
//! Remote audio is fetched by an external `yt-dlp` process.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while resolving a source to a local file
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("File does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Not a supported video URL: {0}")]
    UnsupportedUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Download failed: {0}")]
    Download(String),
}

/// Where a track comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    Local(PathBuf),
    Remote(String),
}

impl TrackSource {
    /// `http://` and `https://` strings are remote, anything else is a path
    pub fn parse(src: &str) -> Self {
        let src = src.trim();
        if src.starts_with("http://") || src.starts_with("https://") {
            TrackSource::Remote(src.to_string())
        } else {
            TrackSource::Local(PathBuf::from(src))
        }
    }

    /// Stable cache key for this source
    ///
    /// Local files include size and modification time so edits invalidate.
    pub fn cache_key(&self) -> Result<String, SourceError> {
        match self {
            TrackSource::Remote(url) => Ok(format!("url:{}", url)),
            TrackSource::Local(path) => file_key(path),
        }
    }
}

impl std::fmt::Display for TrackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackSource::Local(path) => write!(f, "{}", path.display()),
            TrackSource::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Cache key of a local file: path, size and mtime
pub fn file_key(path: &Path) -> Result<String, SourceError> {
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
        _ => SourceError::Io(e),
    })?;
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(format!("file:{}:{}:{}", path.display(), meta.len(), modified))
}

/// Accepts `[http(s)://][www.]youtube.com/...` and `youtu.be/...`
pub fn is_youtube_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.starts_with("youtube.com/") || rest.starts_with("youtu.be/")
}

/// Fetches remote audio to a local file
pub trait Downloader {
    fn download(&self, url: &str) -> Result<PathBuf, SourceError>;
}

/// Downloads YouTube audio as mp3 with the `yt-dlp` program
pub struct YtDlpDownloader {
    program: String,
    work_dir: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            work_dir: work_dir.into(),
        }
    }

    /// Use a different executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Downloader for YtDlpDownloader {
    fn download(&self, url: &str) -> Result<PathBuf, SourceError> {
        if !is_youtube_url(url) {
            return Err(SourceError::UnsupportedUrl(url.to_string()));
        }

        std::fs::create_dir_all(&self.work_dir)?;
        let template = self.work_dir.join("%(title)s.%(ext)s");

        info!(url, "Downloading audio");
        let output = Command::new(&self.program)
            .arg("--no-playlist")
            .arg("--extract-audio")
            .args(["--audio-format", "mp3"])
            .args(["--format", "bestaudio/best"])
            .arg("--windows-filenames")
            .args(["--print", "after_move:filepath"])
            .arg("--output")
            .arg(&template)
            .arg(url)
            .output()?;

        if !output.status.success() {
            return Err(SourceError::Download(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| SourceError::Download("yt-dlp reported no output file".into()))?;

        if !path.exists() {
            return Err(SourceError::Download(format!(
                "downloaded file missing: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}
