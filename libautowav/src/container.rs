//! Persistence of the encoded container and its paired model artifact
//!
//! An encode produces two files that form one unit:
//!
//! | File            | Layout                                             |
//! |-----------------|----------------------------------------------------|
//! | `<path>`        | `AEW!`, version, zstd(MessagePack `{data, params, model_digest}`) |
//! | `<path>.model`  | `AEWM`, version, zstd(MessagePack decoder)         |
//!
//! `model_digest` is the blake3 hash of the model file, so a container loaded
//! next to the wrong model is rejected instead of decoding garbage.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::{
    AwResult, CodecError, StreamParams, COMPRESSION_LEVEL, FORMAT_VERSION, FRAMES_PER_SECOND,
    MAGIC, MODEL_MAGIC, MODEL_SUFFIX, WAV_SUFFIX,
};
use crate::transform::FrameDecoder;

/// latents plus the header parameters needed to rebuild the stream
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedContainer {
    /// one row per frame, in segmentation order
    pub latents: Array2<f32>,
    pub params: StreamParams,
}

impl EncodedContainer {
    pub fn frame_count(&self) -> usize {
        self.latents.nrows()
    }

    pub fn latent_width(&self) -> usize {
        self.latents.ncols()
    }
}

/// on-disk record of the data file
#[derive(Serialize, Deserialize)]
struct ContainerRecord {
    data: LatentArray,
    params: [i64; 4],
    #[serde(with = "serde_bytes")]
    model_digest: Vec<u8>,
}

/// 2-D array stored row-major
#[derive(Serialize, Deserialize)]
struct LatentArray {
    rows: u64,
    cols: u64,
    values: Vec<f32>,
}

/// `<path>.model`
pub fn model_path(path: &Path) -> PathBuf {
    with_suffix(path, MODEL_SUFFIX)
}

/// `<prefix>.wav`
pub fn wav_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, WAV_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Save a container to `path` and its decoder to `path.model`.
///
/// Both payloads are serialized before any file is touched. If the second
/// file cannot be put in place the first is removed again.
pub fn save<D>(path: &Path, container: &EncodedContainer, decoder: &D) -> AwResult<()>
where
    D: FrameDecoder + Serialize,
{
    if decoder.latent_width() != container.latent_width() {
        return Err(CodecError::ShapeMismatch {
            what: "latent width",
            expected: decoder.latent_width(),
            found: container.latent_width(),
        });
    }

    let model_bytes = encode_model(decoder)?;
    let data_bytes = encode_container(container, &model_bytes)?;

    let model_file = model_path(path);
    let staged_model = stage(&model_file, &model_bytes)?;
    let staged_data = stage(path, &data_bytes)?;

    staged_model.persist(&model_file).map_err(|e| e.error)?;
    if let Err(e) = staged_data.persist(path) {
        if let Err(cleanup) = std::fs::remove_file(&model_file) {
            warn!(path = %model_file.display(), error = %cleanup, "could not remove orphaned model");
        }
        return Err(e.error.into());
    }

    debug!(
        data = %path.display(),
        data_bytes = data_bytes.len(),
        model_bytes = model_bytes.len(),
        "saved container"
    );
    Ok(())
}

/// Load a container and its decoder.
///
/// Fails with `MissingArtifact` if either file is absent and with
/// `PairingMismatch` if the model is not the one saved with the container.
pub fn load<D>(path: &Path) -> AwResult<(EncodedContainer, D)>
where
    D: FrameDecoder + DeserializeOwned,
{
    let model_file = model_path(path);
    let data_bytes = read_artifact(path)?;
    let model_bytes = read_artifact(&model_file)?;

    let (container, digest) = decode_container(&data_bytes)?;
    if digest.as_slice() != blake3::hash(&model_bytes).as_bytes() {
        return Err(CodecError::PairingMismatch);
    }

    let decoder: D = decode_model(&model_bytes)?;
    decoder.validate()?;

    debug!(
        data = %path.display(),
        frames = container.frame_count(),
        latent_width = container.latent_width(),
        "loaded container"
    );
    Ok((container, decoder))
}

/// Read only the data file, without the model
pub fn read_container(path: &Path) -> AwResult<EncodedContainer> {
    let bytes = read_artifact(path)?;
    decode_container(&bytes).map(|(container, _)| container)
}

fn read_artifact(path: &Path) -> AwResult<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CodecError::MissingArtifact(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn encode_container(container: &EncodedContainer, model_bytes: &[u8]) -> AwResult<Vec<u8>> {
    let (rows, cols) = container.latents.dim();
    let record = ContainerRecord {
        data: LatentArray {
            rows: rows as u64,
            cols: cols as u64,
            values: container.latents.iter().copied().collect(),
        },
        params: container.params.to_array(),
        model_digest: blake3::hash(model_bytes).as_bytes().to_vec(),
    };

    seal(&MAGIC, &rmp_serde::to_vec_named(&record)?)
}

fn decode_container(bytes: &[u8]) -> AwResult<(EncodedContainer, Vec<u8>)> {
    let payload = unseal(bytes, &MAGIC, "container")?;
    let record: ContainerRecord = rmp_serde::from_slice(&payload)?;

    let rows = record.data.rows as usize;
    let cols = record.data.cols as usize;
    let latents = Array2::from_shape_vec((rows, cols), record.data.values).map_err(|_| {
        CodecError::InvalidContainer(format!("data does not fill a {}x{} array", rows, cols))
    })?;

    let params = StreamParams::from_array(record.params)?;
    check_coverage(&params, rows)?;

    Ok((EncodedContainer { latents, params }, record.model_digest))
}

/// The stored frames must hold at least the samples the header promises
fn check_coverage(params: &StreamParams, rows: usize) -> AwResult<()> {
    let total = params.total_samples()?;
    let frame_length = (params.sample_rate / FRAMES_PER_SECOND) as usize;
    let capacity = rows.checked_mul(frame_length).unwrap_or(usize::MAX);
    if total > capacity {
        return Err(CodecError::InvalidContainer(format!(
            "{} frames of {} samples cannot hold {} samples",
            rows, frame_length, total
        )));
    }
    Ok(())
}

fn encode_model<D: Serialize>(decoder: &D) -> AwResult<Vec<u8>> {
    seal(&MODEL_MAGIC, &rmp_serde::to_vec_named(decoder)?)
}

fn decode_model<D: DeserializeOwned>(bytes: &[u8]) -> AwResult<D> {
    let payload = unseal(bytes, &MODEL_MAGIC, "model artifact")?;
    Ok(rmp_serde::from_slice(&payload)?)
}

/// magic + version + zstd payload
fn seal(magic: &[u8; 4], payload: &[u8]) -> AwResult<Vec<u8>> {
    let compressed = zstd::encode_all(payload, COMPRESSION_LEVEL)?;
    let mut out = Vec::with_capacity(5 + compressed.len());
    out.extend_from_slice(magic);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&compressed);
    Ok(out)
}

fn unseal(bytes: &[u8], magic: &[u8; 4], what: &str) -> AwResult<Vec<u8>> {
    let compressed = check_preamble(bytes, magic, what)?;
    zstd::decode_all(compressed)
        .map_err(|e| CodecError::InvalidContainer(format!("{}: {}", what, e)))
}

fn check_preamble<'a>(bytes: &'a [u8], magic: &[u8; 4], what: &str) -> AwResult<&'a [u8]> {
    if bytes.len() < 5 || &bytes[..4] != magic {
        return Err(CodecError::InvalidContainer(format!("{}: bad magic", what)));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(CodecError::InvalidContainer(format!(
            "{}: unsupported version {}",
            what, bytes[4]
        )));
    }
    Ok(&bytes[5..])
}

/// Write `bytes` to a temp file next to `path`, ready to be persisted
fn stage(path: &Path, bytes: &[u8]) -> AwResult<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

/// Replace `path` with `bytes` in one rename; nothing is left behind on failure
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> AwResult<()> {
    stage(path, bytes)?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixes_append_to_full_path() {
        assert_eq!(model_path(Path::new("out/song.aew")), PathBuf::from("out/song.aew.model"));
        assert_eq!(wav_path(Path::new("decoded")), PathBuf::from("decoded.wav"));
    }

    #[test]
    fn test_preamble_checks() {
        assert!(check_preamble(b"AEW!\x02rest", &MAGIC, "container").is_ok());
        assert!(matches!(
            check_preamble(b"NOPE\x02", &MAGIC, "container"),
            Err(CodecError::InvalidContainer(_))
        ));
        assert!(matches!(
            check_preamble(b"AEW!\x01", &MAGIC, "container"),
            Err(CodecError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_truncated_payload_is_invalid() {
        let sealed = seal(&MAGIC, &[7u8; 64]).unwrap();
        let cut = &sealed[..sealed.len() - 3];
        assert!(matches!(
            unseal(cut, &MAGIC, "container"),
            Err(CodecError::InvalidContainer(_))
        ));
        assert_eq!(unseal(&sealed, &MAGIC, "container").unwrap(), vec![7u8; 64]);
    }

    #[test]
    fn test_coverage_rejects_oversized_header() {
        let params = StreamParams {
            channels: 4,
            sample_count: i64::MAX as u64,
            sample_width: 2,
            sample_rate: 8000,
        };
        assert!(matches!(
            check_coverage(&params, 3),
            Err(CodecError::InvalidContainer(_))
        ));

        let fits = StreamParams {
            sample_count: 60,
            ..params
        };
        assert!(check_coverage(&fits, 3).is_ok());
    }
}
