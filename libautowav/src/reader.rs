use std::path::Path;

use tracing::debug;

use crate::core::{check_width, AwResult, CodecError, SampleStream, StreamParams};

/// PCM format tag
const WAVE_FORMAT_PCM: u16 = 0x0001;

/// WAVE_FORMAT_EXTENSIBLE, still integer PCM for our purposes
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

/// Read a wave file into an interleaved integer sample stream
pub fn read_samples(path: &Path) -> AwResult<SampleStream> {
    let bytes = std::fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "read wave file");
    WaveReader::new().read(&bytes)
}

/// binary reader for RIFF/WAVE pcm
pub struct WaveReader;

/// fields of the `fmt ` chunk we care about
#[derive(Debug, Clone, Copy)]
struct FormatChunk {
    channels: u16,
    sample_rate: u32,
    sample_width: u8,
}

impl WaveReader {
    /// new reader
    pub fn new() -> Self {
        WaveReader
    }

    /// parse a complete wave file
    pub fn read(&self, data: &[u8]) -> AwResult<SampleStream> {
        let mut cursor = Cursor::new(data);

        if cursor.read_bytes(4)? != b"RIFF" {
            return Err(CodecError::InvalidWave("missing RIFF tag".to_string()));
        }
        cursor.skip(4); // riff size, we trust the chunks instead
        if cursor.read_bytes(4)? != b"WAVE" {
            return Err(CodecError::InvalidWave("missing WAVE tag".to_string()));
        }

        let mut format: Option<FormatChunk> = None;

        // walk chunks until data
        while cursor.remaining() >= 8 {
            let id = cursor.read_bytes(4)?;
            let size = cursor.read_u32_le()? as usize;

            match id {
                b"fmt " => {
                    let chunk_end = cursor.pos.saturating_add(size);
                    format = Some(self.read_format(&mut cursor)?);
                    cursor.pos = chunk_end.min(data.len());
                }
                b"data" => {
                    let fmt = format.ok_or_else(|| {
                        CodecError::InvalidWave("data chunk before fmt chunk".to_string())
                    })?;
                    let available = size.min(cursor.remaining());
                    let payload = cursor.read_bytes(available)?;
                    return self.read_payload(fmt, payload);
                }
                _ => {
                    // chunks are word aligned
                    cursor.skip(size + (size & 1));
                }
            }
        }

        Err(CodecError::InvalidWave("no data chunk".to_string()))
    }

    fn read_format(&self, cursor: &mut Cursor) -> AwResult<FormatChunk> {
        let format_tag = cursor.read_u16_le()?;
        let channels = cursor.read_u16_le()?;
        let sample_rate = cursor.read_u32_le()?;
        cursor.skip(4); // byte rate
        cursor.skip(2); // block align
        let bits_per_sample = cursor.read_u16_le()?;

        if format_tag != WAVE_FORMAT_PCM && format_tag != WAVE_FORMAT_EXTENSIBLE {
            return Err(CodecError::InvalidWave(format!(
                "unsupported format tag 0x{:04x}",
                format_tag
            )));
        }
        if channels == 0 {
            return Err(CodecError::InvalidWave("zero channels".to_string()));
        }

        let sample_width = check_width(bits_per_sample.div_ceil(8))?;

        Ok(FormatChunk {
            channels,
            sample_rate,
            sample_width,
        })
    }

    fn read_payload(&self, fmt: FormatChunk, payload: &[u8]) -> AwResult<SampleStream> {
        let channels = fmt.channels as usize;
        let width = fmt.sample_width as usize;
        let frame_bytes = channels * width;
        let sample_count = payload.len() / frame_bytes;
        let payload = &payload[..sample_count * frame_bytes];

        let samples = match fmt.sample_width {
            3 => unpack_24(payload),
            w => unpack(payload, w)?,
        };

        debug!(
            channels = fmt.channels,
            sample_count,
            width = fmt.sample_width,
            rate = fmt.sample_rate,
            "decoded pcm payload"
        );

        let params = StreamParams {
            channels: fmt.channels,
            sample_count: sample_count as u64,
            sample_width: fmt.sample_width,
            sample_rate: fmt.sample_rate,
        };
        Ok(SampleStream::new(params, samples))
    }
}

impl Default for WaveReader {
    fn default() -> Self {
        Self::new()
    }
}

/// 24-bit samples, one frame at a time
///
/// Each 3-byte little-endian value gets a zero low byte in front, making a
/// 32-bit word whose arithmetic shift right by 8 sign-extends the sample.
fn unpack_24(payload: &[u8]) -> Vec<i64> {
    payload
        .chunks_exact(3)
        .map(|b| (i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8) as i64)
        .collect()
}

/// fixed-width signed little-endian samples in one pass
fn unpack(payload: &[u8], width: u8) -> AwResult<Vec<i64>> {
    let samples = match width {
        // 8-bit wave data is unsigned on paper, but is read as signed here
        1 => payload.iter().map(|&b| b as i8 as i64).collect(),
        2 => payload
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as i64)
            .collect(),
        4 => payload
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            .collect(),
        8 => payload
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        w => return Err(CodecError::UnsupportedWidth(w as u16)),
    };
    Ok(samples)
}

// cursor helper

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, count: usize) -> AwResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(CodecError::InvalidWave("unexpected end of file".to_string()));
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    fn skip(&mut self, count: usize) {
        self.pos = self.pos.saturating_add(count).min(self.data.len());
    }

    fn read_u16_le(&mut self) -> AwResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_le(&mut self) -> AwResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
