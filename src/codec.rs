//! Codec boundary: files and byte blobs in, [`AudioBuffer`] out, and back.
//!
//! WAV goes through hound in both directions. Anything else (the mp3 blobs the
//! speech service hands back, effect libraries in flac or ogg) is probed and
//! decoded with Symphonia. Everything this crate writes is WAV: 16-bit PCM for
//! artifacts people listen to, 32-bit float for intermediate renders.
//!
//! [`write_atomic`] is the only way engines put an artifact on disk. It
//! renders into a sibling temp file and renames it over the destination, so a
//! failure part way through leaves the previous file untouched and the temp
//! file is removed when its handle drops.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, ErrorKind, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::buffer::AudioBuffer;
use crate::error::{AudioError, Result};

/// Extension of every artifact this crate writes.
pub const AUDIO_EXT: &str = "wav";

/// Sample encoding for written WAV files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavEncoding {
    Pcm16,
    Float32,
}

impl WavEncoding {
    fn spec(self, buffer: &AudioBuffer) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            WavEncoding::Pcm16 => (16, SampleFormat::Int),
            WavEncoding::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            bits_per_sample,
            sample_format,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode an audio file. The extension picks the fast WAV path; everything
/// else is probed.
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if ext.as_deref() == Some("wav") {
        let reader = WavReader::open(path)?;
        return read_wav(reader);
    }
    let file = File::open(path)?;
    decode_media(Box::new(file), ext.as_deref(), &path.display().to_string())
}

/// Decode an in-memory blob, e.g. the body returned by the speech service.
pub fn decode_bytes(bytes: &[u8]) -> Result<AudioBuffer> {
    if bytes.starts_with(b"RIFF") {
        let reader = WavReader::new(Cursor::new(bytes))?;
        return read_wav(reader);
    }
    decode_media(Box::new(Cursor::new(bytes.to_vec())), None, "<memory>")
}

fn read_wav<R: Read>(mut reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };
    Ok(AudioBuffer::new(samples, spec.sample_rate, spec.channels))
}

fn decode_media(source: Box<dyn MediaSource>, ext: Option<&str>, label: &str) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(source, Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(format!("{label}: {e}")))?;
    let mut reader = probed.format;

    let (track_id, codec_params) = {
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::NoAudioTrack(label.to_string()))?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("{label}: codec init failed: {e}")))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut samples = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(AudioError::Decode(format!("{label}: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping corrupted packet in {}: {}", label, msg);
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("{label}: {e}"))),
        };
        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if sample_rate == 0 || channels == 0 {
        return Err(AudioError::Decode(format!(
            "{label}: stream has no sample rate or channel layout"
        )));
    }
    debug!(
        "Decoded {} ({} Hz, {} ch, {} samples)",
        label,
        sample_rate,
        channels,
        samples.len()
    );
    Ok(AudioBuffer::new(samples, sample_rate, channels))
}

// =============================================================================
// Encoding
// =============================================================================

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn write_wav<W: Write + Seek>(buffer: &AudioBuffer, out: W, encoding: WavEncoding) -> Result<()> {
    let mut writer = WavWriter::new(out, encoding.spec(buffer))?;
    match encoding {
        WavEncoding::Pcm16 => {
            for &s in buffer.samples() {
                writer.write_sample(to_i16(s))?;
            }
        }
        WavEncoding::Float32 => {
            for &s in buffer.samples() {
                writer.write_sample(s)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Encode straight to `path`. Prefer [`write_atomic`] for anything that
/// replaces an existing artifact.
pub fn encode(buffer: &AudioBuffer, path: &Path, encoding: WavEncoding) -> Result<()> {
    let file = File::create(path)?;
    write_wav(buffer, BufWriter::new(file), encoding)
}

/// Encode into memory, for previews that never touch disk.
pub fn encode_bytes(buffer: &AudioBuffer, encoding: WavEncoding) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(buffer, &mut cursor, encoding)?;
    Ok(cursor.into_inner())
}

/// Encode next to `dest` and rename over it once the file is complete.
pub fn write_atomic(buffer: &AudioBuffer, dest: &Path, encoding: WavEncoding) -> Result<()> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let tmp = tempfile::Builder::new()
        .prefix(".pending-")
        .suffix(".wav")
        .tempfile_in(dir)?;
    write_wav(buffer, BufWriter::new(tmp.as_file()), encoding)?;
    tmp.persist(dest).map_err(|e| AudioError::Persist {
        path: dest.display().to_string(),
        reason: e.error.to_string(),
    })?;
    Ok(())
}

/// Copy bytes to `dest` through the same temp-then-rename path.
pub fn copy_atomic(src: &Path, dest: &Path) -> Result<()> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".pending-")
        .tempfile_in(dir)?;
    let mut input = File::open(src)?;
    std::io::copy(&mut input, tmp.as_file_mut())?;
    tmp.persist(dest).map_err(|e| AudioError::Persist {
        path: dest.display().to_string(),
        reason: e.error.to_string(),
    })?;
    Ok(())
}
