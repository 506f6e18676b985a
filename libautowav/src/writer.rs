use std::path::Path;

use tracing::debug;

use crate::container::write_atomic;
use crate::core::{check_width, AwResult, CodecError, SampleStream};

/// Write a sample stream to a wave file
///
/// The file appears only once it is complete.
pub fn write_samples(path: &Path, stream: &SampleStream) -> AwResult<()> {
    let bytes = WaveWriter::new().write(stream)?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote wave file");
    Ok(())
}

/// binary writer for RIFF/WAVE pcm
pub struct WaveWriter {
    buffer: Vec<u8>,
}

impl WaveWriter {
    /// new writer
    pub fn new() -> Self {
        WaveWriter { buffer: Vec::new() }
    }

    /// Physical width used on disk for a logical sample width.
    ///
    /// 24-bit streams are packed with the 32-bit format, so the header
    /// declares 4 bytes to keep the file self-consistent.
    pub fn physical_width(sample_width: u8) -> u8 {
        if sample_width == 3 {
            4
        } else {
            sample_width
        }
    }

    /// write a complete wave file
    pub fn write(mut self, stream: &SampleStream) -> AwResult<Vec<u8>> {
        let width = check_width(stream.sample_width as u16)?;
        let physical = Self::physical_width(width);

        let total = stream.params().total_samples()?;
        if stream.samples.len() != total {
            return Err(CodecError::ShapeMismatch {
                what: "samples",
                expected: total,
                found: stream.samples.len(),
            });
        }

        let data_size = total * physical as usize;
        if data_size > (u32::MAX - 36) as usize {
            return Err(CodecError::InvalidWave(format!(
                "{} bytes of audio do not fit a RIFF container",
                data_size
            )));
        }

        let block_align = stream.channels as usize * physical as usize;
        if block_align > u16::MAX as usize {
            return Err(CodecError::InvalidWave(format!(
                "{} channels of {} bytes exceed the block alignment field",
                stream.channels, physical
            )));
        }

        self.buffer.reserve(44 + data_size);
        self.write_header(stream, physical, data_size as u32);

        for &sample in &stream.samples {
            self.pack(sample, physical);
        }

        Ok(self.buffer)
    }

    fn write_header(&mut self, stream: &SampleStream, width: u8, data_size: u32) {
        let block_align = stream.channels as u32 * width as u32;
        let byte_rate = stream.sample_rate.wrapping_mul(block_align);

        // RIFF header
        self.buffer.extend_from_slice(b"RIFF");
        self.buffer.extend_from_slice(&(36 + data_size).to_le_bytes());
        self.buffer.extend_from_slice(b"WAVE");

        // fmt chunk
        self.buffer.extend_from_slice(b"fmt ");
        self.buffer.extend_from_slice(&16u32.to_le_bytes());
        self.buffer.extend_from_slice(&1u16.to_le_bytes()); // integer pcm
        self.buffer.extend_from_slice(&stream.channels.to_le_bytes());
        self.buffer.extend_from_slice(&stream.sample_rate.to_le_bytes());
        self.buffer.extend_from_slice(&byte_rate.to_le_bytes());
        self.buffer
            .extend_from_slice(&(block_align as u16).to_le_bytes());
        self.buffer
            .extend_from_slice(&(width as u16 * 8).to_le_bytes());

        // data chunk
        self.buffer.extend_from_slice(b"data");
        self.buffer.extend_from_slice(&data_size.to_le_bytes());
    }

    /// signed little-endian, saturating at the width's bounds
    fn pack(&mut self, sample: i64, width: u8) {
        match width {
            1 => self
                .buffer
                .push(sample.clamp(i8::MIN as i64, i8::MAX as i64) as i8 as u8),
            2 => self.buffer.extend_from_slice(
                &(sample.clamp(i16::MIN as i64, i16::MAX as i64) as i16).to_le_bytes(),
            ),
            4 => self.buffer.extend_from_slice(
                &(sample.clamp(i32::MIN as i64, i32::MAX as i64) as i32).to_le_bytes(),
            ),
            _ => self.buffer.extend_from_slice(&sample.to_le_bytes()),
        }
    }
}

impl Default for WaveWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StreamParams;

    fn stream(width: u8, samples: Vec<i64>) -> SampleStream {
        let params = StreamParams {
            channels: 1,
            sample_count: samples.len() as u64,
            sample_width: width,
            sample_rate: 8000,
        };
        SampleStream::new(params, samples)
    }

    #[test]
    fn test_header_layout() {
        let bytes = WaveWriter::new().write(&stream(2, vec![1, -1])).unwrap();
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 40);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[44..], &[0x01, 0x00, 0xff, 0xff]);
    }

    #[test]
    fn test_width_3_written_as_32_bit() {
        let bytes = WaveWriter::new().write(&stream(3, vec![-1])).unwrap();
        // bits per sample
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 32);
        assert_eq!(&bytes[44..], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_8bit_saturates() {
        let bytes = WaveWriter::new().write(&stream(1, vec![300, -300, 5])).unwrap();
        assert_eq!(&bytes[44..], &[0x7f, 0x80, 0x05]);
    }

    #[test]
    fn test_block_align_overflow() {
        let params = StreamParams {
            channels: 10_000,
            sample_count: 0,
            sample_width: 8,
            sample_rate: 8000,
        };
        assert!(matches!(
            WaveWriter::new().write(&SampleStream::new(params, Vec::new())),
            Err(CodecError::InvalidWave(_))
        ));
    }

    #[test]
    fn test_sample_count_must_match() {
        let mut s = stream(2, vec![0, 0, 0]);
        s.sample_count = 4;
        assert!(matches!(
            WaveWriter::new().write(&s),
            Err(CodecError::ShapeMismatch { expected: 4, found: 3, .. })
        ));
    }
}
