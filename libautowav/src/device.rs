//! Process-wide compute budget
//!
//! Installed once before any pipeline stage runs and never reset. The
//! fraction caps the worker threads available to transform inference.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::core::{AwResult, CodecError};

static MEMORY_FRACTION: OnceLock<f32> = OnceLock::new();

/// Cap the share of the machine the transform may use.
///
/// The first call wins. Later calls are ignored and logged.
pub fn limit_memory_fraction(fraction: f32) -> AwResult<()> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(CodecError::Config(format!(
            "memory fraction must be in (0, 1], got {}",
            fraction
        )));
    }

    if MEMORY_FRACTION.set(fraction).is_err() {
        warn!(
            installed = MEMORY_FRACTION.get().copied(),
            requested = fraction,
            "device budget already set, ignoring"
        );
        return Ok(());
    }

    let threads = worker_threads(fraction, num_cpus::get());
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => debug!(fraction, threads, "device budget installed"),
        Err(e) => warn!(error = %e, "worker pool already running, thread cap not applied"),
    }
    Ok(())
}

/// installed fraction, if any
pub fn memory_fraction() -> Option<f32> {
    MEMORY_FRACTION.get().copied()
}

/// `max(1, round(fraction * cpus))`
pub fn worker_threads(fraction: f32, cpus: usize) -> usize {
    ((fraction * cpus as f32).round() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_threads() {
        assert_eq!(worker_threads(0.7, 8), 6);
        assert_eq!(worker_threads(1.0, 4), 4);
        assert_eq!(worker_threads(0.01, 4), 1);
    }

    #[test]
    fn test_first_fraction_sticks() {
        limit_memory_fraction(0.5).unwrap();
        limit_memory_fraction(0.9).unwrap();
        assert_eq!(memory_fraction(), Some(0.5));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(limit_memory_fraction(0.0).is_err());
        assert!(limit_memory_fraction(1.5).is_err());
    }
}
