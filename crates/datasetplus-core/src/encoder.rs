//! Audio container detection and WAV encoding

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
    Ogg,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// Identify the container from its leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => {
                Some(AudioFormat::Wav)
            }
            [b'f', b'L', b'a', b'C', ..] => Some(AudioFormat::Flac),
            [b'O', b'g', b'g', b'S', ..] => Some(AudioFormat::Ogg),
            [b'I', b'D', b'3', ..] => Some(AudioFormat::Mp3),
            // MPEG audio frame sync
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(AudioFormat::Mp3),
            _ => None,
        }
    }
}

/// Length of a FLAC `STREAMINFO` metadata block body
const FLAC_STREAMINFO_LEN: u32 = 34;

/// Check that a payload in a recognised container is structurally sound.
///
/// Payloads whose container is not recognised pass through unchecked. MP3 has
/// no header worth checking without decoding frames.
pub fn verify_container(bytes: &[u8]) -> Result<Option<AudioFormat>, String> {
    let format = AudioFormat::sniff(bytes);

    match format {
        Some(AudioFormat::Wav) => {
            let reader = WavReader::new(Cursor::new(bytes))
                .map_err(|e| format!("corrupt WAV header: {}", e))?;
            let spec = reader.spec();
            let needed = reader.len() as u64 * ((spec.bits_per_sample as u64 + 7) / 8);
            let offset = reader.into_inner().position();
            let available = bytes.len() as u64 - offset;
            if available < needed {
                return Err(format!(
                    "truncated WAV data: {} of {} bytes",
                    available, needed
                ));
            }
        }
        Some(AudioFormat::Flac) => {
            // the first metadata block must be STREAMINFO
            let streaminfo = bytes.len() >= 8
                && bytes[4] & 0x7F == 0
                && u32::from_be_bytes([0, bytes[5], bytes[6], bytes[7]]) == FLAC_STREAMINFO_LEN
                && bytes.len() >= 8 + FLAC_STREAMINFO_LEN as usize;
            if !streaminfo {
                return Err("corrupt FLAC header: missing STREAMINFO".to_string());
            }
        }
        Some(AudioFormat::Ogg) => {
            // 27-byte page header, stream structure version 0
            if bytes.len() < 27 || bytes[4] != 0 {
                return Err("corrupt Ogg page header".to_string());
            }
        }
        Some(AudioFormat::Mp3) | None => {}
    }

    Ok(format)
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Wav => write!(f, "WAV"),
            AudioFormat::Flac => write!(f, "FLAC"),
            AudioFormat::Ogg => write!(f, "Ogg"),
            AudioFormat::Mp3 => write!(f, "MP3"),
        }
    }
}

/// Encode mono float samples in [-1, 1] as 16-bit PCM WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let clamped = if sample.is_finite() {
                sample.clamp(-1.0, 1.0)
            } else {
                0.0
            };
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
