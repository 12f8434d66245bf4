//! Final-mix sample format conversion
//!
//! The mixer works in interleaved f32 in [-1.0, 1.0] and converts to the
//! device's format as the last step of the callback. Conversion saturates:
//! a hot mix clips at the format's representable range rather than wrapping.

use polymix_core::SampleFormat;

/// Writes a float mix into a raw device buffer in one fixed format
pub(crate) type SampleConverter = fn(&mut [u8], &[f32]);

/// Look up the converter for a device format
pub(crate) fn converter_for(format: SampleFormat) -> SampleConverter {
    match format {
        SampleFormat::S8 => to_s8,
        SampleFormat::U8 => to_u8,
        SampleFormat::S16Le => to_s16_le,
        SampleFormat::S16Be => to_s16_be,
        SampleFormat::S32Le => to_s32_le,
        SampleFormat::S32Be => to_s32_be,
        SampleFormat::F32Le => to_f32_le,
        SampleFormat::F32Be => to_f32_be,
    }
}

fn to_s8(out: &mut [u8], mix: &[f32]) {
    for (byte, &sample) in out.iter_mut().zip(mix) {
        *byte = (sample.clamp(-1.0, 1.0) * f32::from(i8::MAX)) as i8 as u8;
    }
}

fn to_u8(out: &mut [u8], mix: &[f32]) {
    for (byte, &sample) in out.iter_mut().zip(mix) {
        let signed = (sample.clamp(-1.0, 1.0) * f32::from(i8::MAX)) as i8;
        *byte = (i16::from(signed) + 128) as u8;
    }
}

fn to_s16_le(out: &mut [u8], mix: &[f32]) {
    for (bytes, &sample) in out.chunks_exact_mut(2).zip(mix) {
        let v = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        bytes.copy_from_slice(&v.to_le_bytes());
    }
}

fn to_s16_be(out: &mut [u8], mix: &[f32]) {
    for (bytes, &sample) in out.chunks_exact_mut(2).zip(mix) {
        let v = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        bytes.copy_from_slice(&v.to_be_bytes());
    }
}

fn to_s32_le(out: &mut [u8], mix: &[f32]) {
    for (bytes, &sample) in out.chunks_exact_mut(4).zip(mix) {
        let v = (sample.clamp(-1.0, 1.0) * i32::MAX as f32) as i32;
        bytes.copy_from_slice(&v.to_le_bytes());
    }
}

fn to_s32_be(out: &mut [u8], mix: &[f32]) {
    for (bytes, &sample) in out.chunks_exact_mut(4).zip(mix) {
        let v = (sample.clamp(-1.0, 1.0) * i32::MAX as f32) as i32;
        bytes.copy_from_slice(&v.to_be_bytes());
    }
}

fn to_f32_le(out: &mut [u8], mix: &[f32]) {
    for (bytes, &sample) in out.chunks_exact_mut(4).zip(mix) {
        bytes.copy_from_slice(&sample.to_le_bytes());
    }
}

fn to_f32_be(out: &mut [u8], mix: &[f32]) {
    for (bytes, &sample) in out.chunks_exact_mut(4).zip(mix) {
        bytes.copy_from_slice(&sample.to_be_bytes());
    }
}
