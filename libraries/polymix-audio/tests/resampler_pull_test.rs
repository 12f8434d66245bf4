//! End-to-end pulls through the resampler, including mid-stream rate changes

mod helpers;

use helpers::{CountingDecoder, RepeatKernel, ScriptedDecoder, Segment};
use polymix_audio::{DecoderAdapter, StreamResampler};

fn drain(resampler: &mut StreamResampler, request: usize) -> Vec<f32> {
    let mut out = Vec::new();
    let mut buf = vec![0.0f32; request];
    loop {
        let n = resampler.resample(&mut buf);
        out.extend_from_slice(&buf[..n]);
        if n < buf.len() {
            break;
        }
    }
    out
}

/// A two-segment stream: 22.05 kHz then 44.1 kHz, with distinct markers
fn rate_change_decoder() -> ScriptedDecoder {
    ScriptedDecoder::new(vec![
        Segment {
            rate: 22_050,
            channels: 1,
            samples: (0..1000).map(|i| i as f32).collect(),
        },
        Segment {
            rate: 44_100,
            channels: 1,
            samples: (0..500).map(|i| 10_000.0 + i as f32).collect(),
        },
    ])
}

/// The exact output the rate-change stream must produce at 44.1 kHz with a
/// sample-repeating kernel: every old-rate sample twice, every new-rate
/// sample once.
fn rate_change_expected() -> Vec<f32> {
    let mut expected = Vec::with_capacity(2500);
    for i in 0..1000 {
        expected.push(i as f32);
        expected.push(i as f32);
    }
    for i in 0..500 {
        expected.push(10_000.0 + i as f32);
    }
    expected
}

#[test]
fn integer_upsampling_repeats_every_sample() {
    let decoder = ScriptedDecoder::new(vec![Segment {
        rate: 22_050,
        channels: 1,
        samples: (0..100).map(|i| i as f32).collect(),
    }]);
    let adapter = DecoderAdapter::new(Box::new(decoder), 1);
    let mut resampler = StreamResampler::new(adapter, Box::new(RepeatKernel::new()));
    resampler.set_spec(44_100, 1, 64).unwrap();

    let out = drain(&mut resampler, 32);
    assert_eq!(out.len(), 200);
    for (i, &s) in out.iter().enumerate() {
        assert_eq!(s, (i / 2) as f32);
    }
}

#[test]
fn mid_stream_rate_change_drops_and_duplicates_nothing() {
    // Request size equal to one output chunk: the spec change lands exactly
    // between pulls.
    let adapter = DecoderAdapter::new(Box::new(rate_change_decoder()), 1);
    let mut resampler = StreamResampler::new(adapter, Box::new(RepeatKernel::new()));
    resampler.set_spec(44_100, 1, 100).unwrap();

    let out = drain(&mut resampler, 100);
    assert_eq!(out, rate_change_expected());
    assert_eq!(resampler.src_rate(), 44_100);
}

#[test]
fn mid_stream_rate_change_survives_awkward_request_sizes() {
    // Small, misaligned requests force the pending-spec-change path: the
    // change arrives while the destination is already full, and the old
    // ratio has to persist across calls until the buffers drain.
    for request in [7usize, 10, 33, 64, 250] {
        let adapter = DecoderAdapter::new(Box::new(rate_change_decoder()), 1);
        let mut resampler = StreamResampler::new(adapter, Box::new(RepeatKernel::new()));
        resampler.set_spec(44_100, 1, 100).unwrap();

        let out = drain(&mut resampler, request);
        assert_eq!(out, rate_change_expected(), "request size {request}");
    }
}

#[test]
fn short_read_happens_only_at_end_of_stream() {
    let decoder = ScriptedDecoder::new(vec![Segment {
        rate: 44_100,
        channels: 2,
        samples: vec![0.5; 1000],
    }]);
    let adapter = DecoderAdapter::new(Box::new(decoder), 2);
    let mut resampler = StreamResampler::new(adapter, Box::new(RepeatKernel::new()));
    resampler.set_spec(44_100, 2, 128).unwrap();

    let mut buf = vec![0.0f32; 300];
    assert_eq!(resampler.resample(&mut buf), 300);
    assert_eq!(resampler.resample(&mut buf), 300);
    assert_eq!(resampler.resample(&mut buf), 300);
    // 100 left
    assert_eq!(resampler.resample(&mut buf), 100);
    assert_eq!(resampler.resample(&mut buf), 0);
}

#[test]
fn same_rate_passthrough_preserves_the_sequence() {
    let adapter = DecoderAdapter::new(Box::new(CountingDecoder::new(48_000, 2)), 2);
    let mut resampler = StreamResampler::new(adapter, Box::new(RepeatKernel::new()));
    resampler.set_spec(48_000, 2, 256).unwrap();

    let mut collected = Vec::new();
    let mut buf = vec![0.0f32; 113];
    for _ in 0..50 {
        let n = resampler.resample(&mut buf);
        assert_eq!(n, buf.len());
        collected.extend_from_slice(&buf[..n]);
    }
    for (i, &s) in collected.iter().enumerate() {
        assert_eq!(s, i as f32);
    }
}

#[test]
fn mono_source_resampled_to_stereo_output() {
    // Channel adaptation happens before the rate conversion: a mono source
    // into a stereo pipeline doubles up, then the kernel repeats frames.
    let decoder = ScriptedDecoder::new(vec![Segment {
        rate: 24_000,
        channels: 1,
        samples: (0..50).map(|i| i as f32).collect(),
    }]);
    let adapter = DecoderAdapter::new(Box::new(decoder), 2);
    let mut resampler = StreamResampler::new(adapter, Box::new(RepeatKernel::new()));
    resampler.set_spec(48_000, 2, 32).unwrap();

    let out = drain(&mut resampler, 40);
    // 50 mono samples -> 100 stereo samples -> 200 at double rate.
    assert_eq!(out.len(), 200);
    // Every source sample appears as two identical stereo frames.
    for (i, frame) in out.chunks_exact(2).enumerate() {
        assert_eq!(frame[0], (i / 2) as f32);
        assert_eq!(frame[1], (i / 2) as f32);
    }
}
