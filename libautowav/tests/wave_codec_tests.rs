//! Wave file reading and writing across sample widths

use libautowav::{read_samples, write_samples, CodecError, SampleStream, StreamParams, WaveReader};
use tempfile::TempDir;

fn hound_spec(channels: u16, sample_rate: u32, bits: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    }
}

/// canonical 44-byte header followed by `payload`
fn raw_wave(channels: u16, sample_rate: u32, bits: u16, payload: &[u8]) -> Vec<u8> {
    let block_align = channels * bits.div_ceil(8);
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + payload.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_read_16bit_stereo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");

    let samples: Vec<i16> = (0..200).map(|i| ((i * 331) % 65536 - 32768) as i16).collect();
    let mut writer = hound::WavWriter::create(&path, hound_spec(2, 8000, 16)).unwrap();
    for &s in &samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let stream = read_samples(&path).unwrap();
    assert_eq!(stream.channels, 2);
    assert_eq!(stream.sample_count, 100);
    assert_eq!(stream.sample_width, 2);
    assert_eq!(stream.sample_rate, 8000);
    let expected: Vec<i64> = samples.iter().map(|&s| s as i64).collect();
    assert_eq!(stream.samples, expected);
}

#[test]
fn test_read_24bit_sign_extends() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deep.wav");

    let samples = [0i32, 1, -1, 8_388_607, -8_388_608, 123_456, -654_321];
    let mut writer = hound::WavWriter::create(&path, hound_spec(1, 44100, 24)).unwrap();
    for &s in &samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let stream = read_samples(&path).unwrap();
    assert_eq!(stream.sample_width, 3);
    assert_eq!(stream.sample_count, samples.len() as u64);
    let expected: Vec<i64> = samples.iter().map(|&s| s as i64).collect();
    assert_eq!(stream.samples, expected);
}

#[test]
fn test_read_64bit() {
    let values = [i64::MIN, -1, 0, 1, i64::MAX];
    let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let bytes = raw_wave(1, 1000, 64, &payload);

    let stream = WaveReader::new().read(&bytes).unwrap();
    assert_eq!(stream.sample_width, 8);
    assert_eq!(stream.samples, values.to_vec());
}

#[test]
fn test_read_skips_unknown_chunks() {
    let mut bytes = raw_wave(1, 8000, 16, &[0x01, 0x00, 0xfe, 0xff]);
    // odd-sized LIST chunk between fmt and data, padded to even
    let list = [b'L', b'I', b'S', b'T', 3, 0, 0, 0, b'a', b'b', b'c', 0];
    bytes.splice(36..36, list.iter().copied());

    let stream = WaveReader::new().read(&bytes).unwrap();
    assert_eq!(stream.samples, vec![1, -2]);
}

#[test]
fn test_read_drops_partial_trailing_frame() {
    let bytes = raw_wave(2, 8000, 16, &[1, 0, 2, 0, 3, 0]);
    let stream = WaveReader::new().read(&bytes).unwrap();
    assert_eq!(stream.sample_count, 1);
    assert_eq!(stream.samples, vec![1, 2]);
}

#[test]
fn test_unsupported_width() {
    let bytes = raw_wave(1, 8000, 48, &[0; 12]);
    assert!(matches!(
        WaveReader::new().read(&bytes),
        Err(CodecError::UnsupportedWidth(6))
    ));
}

#[test]
fn test_not_a_wave_file() {
    assert!(matches!(
        WaveReader::new().read(b"definitely not audio"),
        Err(CodecError::InvalidWave(_))
    ));
    assert!(matches!(
        WaveReader::new().read(&[]),
        Err(CodecError::InvalidWave(_))
    ));
}

#[test]
fn test_zero_channels_rejected() {
    let bytes = raw_wave(0, 8000, 16, &[]);
    assert!(matches!(
        WaveReader::new().read(&bytes),
        Err(CodecError::InvalidWave(_))
    ));
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn test_write_16bit_readable_by_hound() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.wav");

    let params = StreamParams {
        channels: 2,
        sample_count: 3,
        sample_width: 2,
        sample_rate: 22050,
    };
    let stream = SampleStream::new(params, vec![0, 1, -1, 32767, -32768, 42]);
    write_samples(&path, &stream).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(spec.bits_per_sample, 16);
    let read: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read, vec![0, 1, -1, 32767, -32768, 42]);
}

#[test]
fn test_write_24bit_stream_becomes_32bit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deep.wav");

    let params = StreamParams {
        channels: 1,
        sample_count: 3,
        sample_width: 3,
        sample_rate: 48000,
    };
    let stream = SampleStream::new(params, vec![-1, 8_388_607, -8_388_608]);
    write_samples(&path, &stream).unwrap();

    let back = read_samples(&path).unwrap();
    assert_eq!(back.sample_width, 4);
    assert_eq!(back.samples, stream.samples);
}

#[test]
fn test_round_trip_widths() {
    let dir = TempDir::new().unwrap();

    for (width, samples) in [
        (1u8, vec![-128i64, -1, 0, 127]),
        (2, vec![-32768, -1, 0, 32767]),
        (4, vec![i32::MIN as i64, -1, 0, i32::MAX as i64]),
        (8, vec![i64::MIN, -1, 0, i64::MAX]),
    ] {
        let path = dir.path().join(format!("w{}.wav", width));
        let params = StreamParams {
            channels: 1,
            sample_count: samples.len() as u64,
            sample_width: width,
            sample_rate: 8000,
        };
        let stream = SampleStream::new(params, samples);
        write_samples(&path, &stream).unwrap();
        assert_eq!(read_samples(&path).unwrap(), stream, "width {}", width);
    }
}

#[test]
fn test_failed_write_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.wav");

    let params = StreamParams {
        channels: 1,
        sample_count: 2,
        sample_width: 5,
        sample_rate: 8000,
    };
    let stream = SampleStream::new(params, vec![0, 0]);
    assert!(matches!(
        write_samples(&path, &stream),
        Err(CodecError::UnsupportedWidth(5))
    ));
    assert!(!path.exists());
}
