//! Batch manifest parsing
//!
//! A CSV file with a header row. The `src` column names a local file or a
//! URL; the other recognized columns override detection parameters for that
//! row. Lines starting with `#` are comments. Fields may be double-quoted
//! to hold commas, with `""` standing for a literal quote.

use crate::source::TrackSource;
use blast_analysis::{DetectionParams, FrequencyRange};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Manifest has no header row")]
    MissingHeader,
    #[error("Manifest header has no `src` column")]
    MissingSourceColumn,
    #[error("Line {line}: invalid value {value:?} for {column}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },
}

/// Per-track overrides of the base detection parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    pub peak_detection_band_width: Option<f32>,
    pub peak_detection_min_area_threshold: Option<f32>,
    pub step_size_in_seconds: Option<f32>,
    pub bass_drum_range: Option<FrequencyRange>,
    pub snare_range: Option<FrequencyRange>,
    pub min_consecutive_hits: Option<usize>,
}

impl ParamOverrides {
    /// `base` with every present override applied
    pub fn apply(&self, base: &DetectionParams) -> DetectionParams {
        DetectionParams {
            peak_detection_band_width: self
                .peak_detection_band_width
                .unwrap_or(base.peak_detection_band_width),
            peak_detection_min_area_threshold: self
                .peak_detection_min_area_threshold
                .unwrap_or(base.peak_detection_min_area_threshold),
            step_size_in_seconds: self
                .step_size_in_seconds
                .unwrap_or(base.step_size_in_seconds),
            bass_drum_range: self.bass_drum_range.unwrap_or(base.bass_drum_range),
            snare_range: self.snare_range.unwrap_or(base.snare_range),
            min_consecutive_hits: self
                .min_consecutive_hits
                .unwrap_or(base.min_consecutive_hits),
            threads: base.threads,
        }
    }
}

/// One track to process
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub source: TrackSource,
    pub overrides: ParamOverrides,
}

impl ManifestEntry {
    /// Entry with no overrides
    pub fn new(source: TrackSource) -> Self {
        Self {
            source,
            overrides: ParamOverrides::default(),
        }
    }
}

/// Read a manifest file
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    parse_manifest(&content)
}

/// Parse manifest text
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestEntry>, ManifestError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| {
            let line = line.trim_start();
            !line.is_empty() && !line.starts_with('#')
        });

    let (_, header) = lines.next().ok_or(ManifestError::MissingHeader)?;
    let columns = split_record(header);
    if !columns.iter().any(|c| c == "src") {
        return Err(ManifestError::MissingSourceColumn);
    }

    let mut entries = Vec::new();
    for (line_no, line) in lines {
        let row = Row {
            line: line_no,
            columns: &columns,
            cells: split_record(line),
        };

        let Some(src) = row.get("src") else {
            continue;
        };

        let overrides = ParamOverrides {
            peak_detection_band_width: row.parse("peak_detection_band_width")?,
            peak_detection_min_area_threshold: row.parse("peak_detection_min_area_threshold")?,
            step_size_in_seconds: row.parse("step_size_in_seconds")?,
            bass_drum_range: row.range("bass_drum_range_start", "bass_drum_range_end")?,
            snare_range: row.range("snare_drum_range_start", "snare_drum_range_end")?,
            min_consecutive_hits: row.parse("min_consecutive_hits")?,
        };

        entries.push(ManifestEntry {
            source: TrackSource::parse(src),
            overrides,
        });
    }

    Ok(entries)
}

/// Split one CSV line into trimmed fields
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if field.trim().is_empty() && !was_quoted => {
                field.clear();
                quoted = true;
                was_quoted = true;
            }
            ',' if !quoted => {
                fields.push(finish_field(&field, was_quoted));
                field.clear();
                was_quoted = false;
            }
            _ => field.push(c),
        }
    }
    fields.push(finish_field(&field, was_quoted));
    fields
}

/// Quoted content is kept verbatim; trailing whitespace after the quote is dropped
fn finish_field(field: &str, was_quoted: bool) -> String {
    if was_quoted {
        field.trim_end().to_string()
    } else {
        field.trim().to_string()
    }
}

struct Row<'a> {
    line: usize,
    columns: &'a [String],
    cells: Vec<String>,
}

impl Row<'_> {
    /// Non-empty cell under `column`
    fn get(&self, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.cells
            .get(idx)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, column: &str) -> Result<Option<T>, ManifestError> {
        self.get(column)
            .map(|value| {
                value.parse().map_err(|_| ManifestError::InvalidValue {
                    line: self.line,
                    column: column.to_string(),
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    /// Range applies only when both ends are given
    fn range(&self, start: &str, end: &str) -> Result<Option<FrequencyRange>, ManifestError> {
        match (self.parse::<f32>(start)?, self.parse::<f32>(end)?) {
            (Some(low), Some(high)) => Ok(Some(FrequencyRange { low, high })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MANIFEST: &str = "\
# songs to scan
src,step_size_in_seconds,snare_drum_range_start,snare_drum_range_end,min_consecutive_hits
https://youtu.be/abc,,,,
  # skipped for now
/music/Track One.mp3,0.1,200,450,6
,0.2,,,
/music/half_range.flac,,200,,
";

    #[test]
    fn test_parse_rows() {
        let entries = parse_manifest(MANIFEST).unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(
            entries[0],
            ManifestEntry::new(TrackSource::Remote("https://youtu.be/abc".into()))
        );

        assert_eq!(
            entries[1].source,
            TrackSource::Local(PathBuf::from("/music/Track One.mp3"))
        );
        assert_eq!(
            entries[1].overrides,
            ParamOverrides {
                step_size_in_seconds: Some(0.1),
                snare_range: Some(FrequencyRange {
                    low: 200.0,
                    high: 450.0
                }),
                min_consecutive_hits: Some(6),
                ..Default::default()
            }
        );

        assert_eq!(entries[2].overrides.snare_range, None);
    }

    #[test]
    fn test_apply_overrides() {
        let base = DetectionParams {
            threads: 4,
            ..DetectionParams::default()
        };
        let overrides = ParamOverrides {
            min_consecutive_hits: Some(3),
            ..Default::default()
        };

        let params = overrides.apply(&base);
        assert_eq!(params.min_consecutive_hits, 3);
        assert_eq!(params.threads, 4);
        assert_eq!(params.step_size_in_seconds, base.step_size_in_seconds);
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let err = parse_manifest("src,min_consecutive_hits\n# c\na.mp3,many\n").unwrap_err();
        match err {
            ManifestError::InvalidValue { line, column, value } => {
                assert_eq!(line, 3);
                assert_eq!(column, "min_consecutive_hits");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(
            parse_manifest("# only comments\n"),
            Err(ManifestError::MissingHeader)
        ));
        assert!(matches!(
            parse_manifest("path,step\nx,1\n"),
            Err(ManifestError::MissingSourceColumn)
        ));
    }

    #[test]
    fn test_quoted_fields() {
        let entries = parse_manifest(
            "src,min_consecutive_hits\n\"/music/Band, The - Song.mp3\",6\n\"say \"\"hi\"\".wav\" , 2\n",
        )
        .unwrap();

        assert_eq!(
            entries[0].source,
            TrackSource::Local(PathBuf::from("/music/Band, The - Song.mp3"))
        );
        assert_eq!(entries[0].overrides.min_consecutive_hits, Some(6));
        assert_eq!(
            entries[1].source,
            TrackSource::Local(PathBuf::from("say \"hi\".wav"))
        );
        assert_eq!(entries[1].overrides.min_consecutive_hits, Some(2));
    }

    #[test]
    fn test_split_record() {
        assert_eq!(split_record(" a , \"b,c\" ,"), vec!["a", "b,c", ""]);
        assert_eq!(split_record("\"\""), vec![""]);
    }

    #[test]
    fn test_load_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.csv");
        std::fs::write(&path, MANIFEST).unwrap();
        assert_eq!(load_manifest(&path).unwrap().len(), 3);
    }
}
