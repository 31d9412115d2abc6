//! Audio ingestion
//!
//! Decodes a container format to interleaved f32 PCM via symphonia and
//! resamples to the canonical 48 kHz rate through the injected resampler
//! capability. A lossy source format is a warning, not an error; an
//! undeterminable sample rate is a `Decode` error.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::{AudioBuffer, CANONICAL_SAMPLE_RATE};
use crate::analysis::capability::Capabilities;
use crate::error::{AnalysisError, AnalysisResult};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Extensions treated as lossy sources for the ingestion warning
const LOSSY_EXTENSIONS: [&str; 3] = ["mp3", "aac", "m4a"];

/// Decode `path` and resample to the canonical rate
pub fn load(
    path: &Path,
    caps: &Capabilities,
    advisories: &AdvisoryCatalog,
) -> AnalysisResult<AudioBuffer> {
    let resampler = caps.resampler()?;

    tracing::debug!(path = %path.display(), "Decoding audio file");

    let file = std::fs::File::open(path)
        .map_err(|e| AnalysisError::Decode(format!("Failed to open {}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let mut hint = Hint::new();
    if let Some(ext) = &extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::Decode(format!("Failed to probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode("No audio track found in file".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::Decode("Could not determine sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels: usize = codec_params.channels.map(|c| c.count()).unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(AnalysisError::Decode(format!("Error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AnalysisError::Decode(format!("Failed to decode packet: {}", e)))?;

        let spec = *decoded.spec();
        if channels == 0 {
            channels = spec.channels.count();
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    // Mono is still one channel dimension
    let channels = channels.max(1);

    if interleaved.is_empty() {
        return Err(AnalysisError::Decode("File contains no audio data".to_string()));
    }

    tracing::debug!(
        path = %path.display(),
        source_rate = source_rate,
        channels = channels,
        frames = interleaved.len() / channels,
        "Audio decoding complete"
    );

    // De-interleave, resample each channel, re-interleave at the target rate
    let mut per_channel: Vec<Vec<f32>> = vec![Vec::with_capacity(interleaved.len() / channels); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            per_channel[ch].push(*sample);
        }
    }

    let resampled = resampler.resample(per_channel, source_rate, CANONICAL_SAMPLE_RATE)?;

    let out_frames = resampled[0].len();
    let mut samples = Vec::with_capacity(out_frames * channels);
    for frame_idx in 0..out_frames {
        for channel in &resampled {
            samples.push(channel[frame_idx]);
        }
    }

    let mut buffer = AudioBuffer::new(samples, channels, CANONICAL_SAMPLE_RATE);
    buffer.source_sample_rate = source_rate;
    buffer.source_format = extension.clone();

    if let Some(ext) = &extension {
        if LOSSY_EXTENSIONS.contains(&ext.as_str()) {
            buffer.warnings.push(advisories.lossy_source.clone());
        }
    }

    Ok(buffer)
}
