//! Helpers shared by unit tests

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Write 16-bit PCM WAV with one `Vec` per channel (equal lengths)
pub fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) {
    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let frames = channels.first().map(|c| c.len()).unwrap_or(0);

    let mut writer = WavWriter::create(path, spec).expect("create test wav");
    for frame in 0..frames {
        for channel in channels {
            let value = (channel[frame].clamp(-1.0, 1.0) * 32767.0).round() as i16;
            writer.write_sample(value).expect("write test sample");
        }
    }
    writer.finalize().expect("finalize test wav");
}
