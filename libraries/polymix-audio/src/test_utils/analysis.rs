//! Signal analysis helpers for tests

/// Calculate RMS (Root Mean Square) level
///
/// RMS is a measure of the average power in a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Calculate peak level
///
/// Returns the absolute maximum sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Whether every sample is below the threshold
pub fn is_silent(samples: &[f32], threshold: f32) -> bool {
    peak(samples) <= threshold
}
