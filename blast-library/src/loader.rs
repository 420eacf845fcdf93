//! Audio file loading and decoding

use blast_analysis::AudioBuffer;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Sample rate the default peak-area threshold was tuned at
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Audio stream contains no samples")]
    Empty,
}

/// Track metadata
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: f64,
    /// Sample rate of the file before resampling
    pub source_sample_rate: u32,
    pub channels: u16,
}

/// A decoded track, downmixed to mono
pub struct LoadedTrack {
    pub buffer: AudioBuffer,
    pub metadata: TrackMetadata,
}

/// Audio file loader using Symphonia
pub struct TrackLoader {
    target_sample_rate: u32,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader {
    /// Create a new track loader at 22.05kHz
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    /// Create a new track loader with specific sample rate
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Load, decode, downmix and resample an audio file
    pub fn load(&self, path: &Path) -> Result<LoadedTrack, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut metadata = self.extract_metadata(&mut format, path);
        metadata.source_sample_rate = source_sample_rate;

        // Interleaved f32
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Stopped reading track early");
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    warn!(path = %path.display(), error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            channels = spec.channels.count() as u16;
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::Empty);
        }

        metadata.channels = channels;
        let mono = downmix(&samples, channels as usize);
        metadata.duration_secs = mono.len() as f64 / source_sample_rate as f64;

        let (mono, final_sample_rate) = if source_sample_rate != self.target_sample_rate {
            (
                self.resample(&mono, source_sample_rate)?,
                self.target_sample_rate,
            )
        } else {
            (mono, source_sample_rate)
        };

        debug!(
            path = %path.display(),
            source_rate = source_sample_rate,
            rate = final_sample_rate,
            channels,
            samples = mono.len(),
            "Decoded track"
        );

        Ok(LoadedTrack {
            buffer: AudioBuffer::new(mono, final_sample_rate),
            metadata,
        })
    }

    /// Resample mono audio to the target sample rate
    ///
    /// The resampler's output delay is dropped and the tail is flushed with
    /// silence, so output sample `i` lines up with time `i / target_rate`.
    fn resample(&self, samples: &[f32], source_rate: u32) -> Result<Vec<f32>, LoadError> {
        use rubato::{FftFixedInOut, Resampler};

        let mut resampler = FftFixedInOut::<f32>::new(
            source_rate as usize,
            self.target_sample_rate as usize,
            1024,
            1,
        )
        .map_err(|e| LoadError::Decode(e.to_string()))?;

        let chunk_size = resampler.input_frames_next();
        let delay = resampler.output_delay();
        let expected = (samples.len() as u64 * self.target_sample_rate as u64
            / source_rate as u64) as usize;
        let mut output: Vec<f32> = Vec::with_capacity(delay + expected + chunk_size);

        let mut chunks = samples.chunks(chunk_size);
        let mut padded = vec![0.0f32; chunk_size];
        while output.len() < delay + expected {
            padded.fill(0.0);
            if let Some(chunk) = chunks.next() {
                padded[..chunk.len()].copy_from_slice(chunk);
            }

            let resampled = resampler
                .process(&[padded.as_slice()], None)
                .map_err(|e| LoadError::Decode(e.to_string()))?;
            match resampled.into_iter().next() {
                Some(channel) if !channel.is_empty() => output.extend(channel),
                _ => break,
            }
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected);
        Ok(output)
    }

    /// Extract metadata from format reader
    fn extract_metadata(
        &self,
        format: &mut Box<dyn symphonia::core::formats::FormatReader>,
        path: &Path,
    ) -> TrackMetadata {
        let mut metadata = TrackMetadata {
            title: path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string(),
            artist: "Unknown".to_string(),
            album: "Unknown".to_string(),
            ..Default::default()
        };

        if let Some(meta) = format.metadata().current() {
            for tag in meta.tags() {
                match tag.std_key {
                    Some(symphonia::core::meta::StandardTagKey::TrackTitle) => {
                        metadata.title = tag.value.to_string();
                    }
                    Some(symphonia::core::meta::StandardTagKey::Artist) => {
                        metadata.artist = tag.value.to_string();
                    }
                    Some(symphonia::core::meta::StandardTagKey::Album) => {
                        metadata.album = tag.value.to_string();
                    }
                    _ => {}
                }
            }
        }

        metadata
    }
}

/// Average interleaved channels into one
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
