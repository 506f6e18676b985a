/// Full-scale magnitude of a 16-bit signed sample (2^15)
pub const I16_FULL_SCALE_F64: f64 = 32768.0;

/// Full-scale magnitude as f32
pub const I16_FULL_SCALE_F32: f32 = 32768.0;

/// Minimum value for 16-bit signed integer (-2^15)
pub const I16_MIN: i64 = -32768;

/// Maximum value for 16-bit signed integer (2^15 - 1)
pub const I16_MAX: i64 = 32767;

/// Bound a reconstructed sample to the 16-bit range.
///
/// The decoder output is not exact, so anything outside the valid range
/// is pinned to the nearest bound.
#[inline]
pub fn norm(sample: i64) -> i64 {
    sample.clamp(I16_MIN, I16_MAX)
}

/// Map an integer sample onto `[0.0, 1.0]` assuming 16-bit full scale.
///
/// Samples from wider streams are not rescaled first, so they land outside
/// the unit interval.
#[inline]
pub fn normalize_sample(sample: i64) -> f32 {
    ((sample as f32 / I16_FULL_SCALE_F32) + 1.0) / 2.0
}

/// Inverse of [`normalize_sample`], rounded to the nearest integer and
/// clamped with [`norm`].
#[inline]
pub fn denormalize_sample(value: f32) -> i64 {
    // float-to-int casts saturate, so infinities land on the clamp bounds
    let scaled = ((value as f64 * 2.0) - 1.0) * I16_FULL_SCALE_F64;
    norm(scaled.round() as i64)
}
