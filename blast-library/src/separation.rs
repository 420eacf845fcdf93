//! Drum stem isolation
//!
//! Separation runs in an external `demucs` process; the result is copied
//! next to the input as `<stem>_drums.wav`.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::info;

/// Errors that can occur during drum isolation
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Input file does not exist: {0}")]
    MissingInput(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Separator failed: {0}")]
    Failed(String),
}

/// Produces a drums-only track from a full mix
pub trait DrumSeparator {
    /// Names the separation method; part of the drum-stem cache key
    fn id(&self) -> String;

    fn separate(&self, input: &Path) -> Result<PathBuf, SeparationError>;
}

/// Input is already a drum stem
pub struct PassthroughSeparator;

impl DrumSeparator for PassthroughSeparator {
    fn id(&self) -> String {
        "passthrough".to_string()
    }

    fn separate(&self, input: &Path) -> Result<PathBuf, SeparationError> {
        if !input.exists() {
            return Err(SeparationError::MissingInput(input.to_path_buf()));
        }
        Ok(input.to_path_buf())
    }
}

/// Two-stem Demucs separation
pub struct DemucsSeparator {
    program: String,
    device: String,
    model: String,
}

impl Default for DemucsSeparator {
    fn default() -> Self {
        Self::new("cuda")
    }
}

impl DemucsSeparator {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            program: "demucs".to_string(),
            device: device.into(),
            model: "htdemucs".to_string(),
        }
    }

    /// Use a different executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

/// `<parent>/<stem>_drums.wav`
pub fn drum_stem_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_drums.wav", stem))
}

impl DrumSeparator for DemucsSeparator {
    fn id(&self) -> String {
        format!("demucs:{}", self.model)
    }

    fn separate(&self, input: &Path) -> Result<PathBuf, SeparationError> {
        if !input.exists() {
            return Err(SeparationError::MissingInput(input.to_path_buf()));
        }

        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let separated_dir = parent.join(&self.model).join(&stem);
        let target = drum_stem_path(input);

        info!(input = %input.display(), device = %self.device, "Isolating drums");
        let output = Command::new(&self.program)
            .args(["--two-stems", "drums"])
            .args(["--device", &self.device])
            .args(["-n", &self.model])
            .arg("-o")
            .arg(parent)
            .arg(input)
            .output()?;

        if !output.status.success() {
            return Err(SeparationError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let drums = separated_dir.join("drums.wav");
        if !drums.exists() {
            return Err(SeparationError::Failed(format!(
                "expected output missing: {}",
                drums.display()
            )));
        }

        std::fs::copy(&drums, &target)?;
        std::fs::remove_dir_all(&separated_dir)?;

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drum_stem_path() {
        assert_eq!(
            drum_stem_path(Path::new("/music/Some Song.mp3")),
            PathBuf::from("/music/Some Song_drums.wav")
        );
    }

    #[test]
    fn test_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drums.wav");
        std::fs::write(&path, b"").unwrap();

        assert_eq!(PassthroughSeparator.separate(&path).unwrap(), path);
        assert_ne!(PassthroughSeparator.id(), DemucsSeparator::default().id());
        assert!(matches!(
            PassthroughSeparator.separate(&dir.path().join("missing.wav")),
            Err(SeparationError::MissingInput(_))
        ));
    }

    #[test]
    fn test_demucs_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mix.wav");
        std::fs::write(&path, b"").unwrap();

        let separator = DemucsSeparator::new("cpu").with_program("/nonexistent/demucs");
        assert!(matches!(
            separator.separate(&path),
            Err(SeparationError::Io(_))
        ));
    }
}
