//! Test signal generation
//!
//! Standard signals for exercising the decode/resample/mix path:
//! sine waves, square waves, white noise, silence.

use std::f32::consts::PI;

/// Generate a stereo interleaved sine wave
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn sine_wave(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(frames * 2);

    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency * t).sin() * amplitude;
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

/// Generate a mono sine wave
pub fn mono_sine_wave(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * duration) as usize;
    (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * PI * frequency * t).sin() * amplitude
        })
        .collect()
}

/// Generate a stereo interleaved square wave
pub fn square_wave(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(frames * 2);

    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let phase = (t * frequency).fract();
        let sample = if phase < 0.5 { amplitude } else { -amplitude };
        samples.push(sample);
        samples.push(sample);
    }

    samples
}

/// Generate stereo interleaved white noise
pub fn white_noise(sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(frames * 2);

    for _ in 0..frames {
        let sample = (rand::random::<f32>() * 2.0 - 1.0) * amplitude;
        samples.push(sample);
        samples.push(sample);
    }

    samples
}

/// Generate stereo silence
pub fn silence(sample_rate: u32, duration: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * duration) as usize;
    vec![0.0; frames * 2]
}
