//! End-to-end mixer scenarios driven through a manual device

mod helpers;

use helpers::{
    init_mixer, test_spec, ConstDecoder, FiniteDecoder, GainProcessor, OffsetProcessor,
};
use polymix_playback::{mixer, Stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NO_FADE: Duration = Duration::ZERO;

#[test]
fn silent_mix_with_no_streams() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    // 1024 stereo f32 frames: 8192 bytes, all zero.
    let mut out = vec![0xABu8; spec.bytes_per_buffer()];
    handle.run_callback(&mut out);
    assert_eq!(out.len(), 8192);
    assert!(out.iter().all(|&b| b == 0));

    mixer::quit();
}

#[test]
fn single_unity_stream_passes_through() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    // Mono constant source at the device rate, no resampler.
    let stream = Stream::new(Box::new(ConstDecoder::new(1.0, 44_100, 1)));
    stream.open().unwrap();
    stream.play(0, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    assert_eq!(mix.len(), 2048);
    assert!(mix.iter().all(|&s| s == 1.0));

    mixer::quit();
}

#[test]
fn stereo_pan_full_left() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    let stream = Stream::new(Box::new(ConstDecoder::new(1.0, 44_100, 2)));
    stream.open().unwrap();
    stream.set_stereo_position(-1.0);
    stream.play(0, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    for frame in mix.chunks_exact(2) {
        assert_eq!(frame[0], 1.0, "left stays at unity");
        assert_eq!(frame[1], 0.0, "right is fully attenuated");
    }

    mixer::quit();
}

#[test]
fn loop_twice_then_finish_once() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    let finishes = Arc::new(AtomicUsize::new(0));
    let stream = Stream::new(Box::new(FiniteDecoder::new(1.0, 100, 44_100, 2)));
    stream.open().unwrap();
    let counter = finishes.clone();
    stream.set_finish_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    stream.play(2, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    // Two passes of 100 samples each, then silence.
    let produced = mix.iter().filter(|&&s| s != 0.0).count();
    assert_eq!(produced, 200);
    assert!(mix[..200].iter().all(|&s| s == 1.0));
    assert!(mix[200..].iter().all(|&s| s == 0.0));

    assert_eq!(finishes.load(Ordering::SeqCst), 1);
    assert!(!stream.is_playing());
    assert_eq!(stream.current_iteration(), 2);

    // The stream is out of the active list: later callbacks are silent and
    // the finish callback does not fire again.
    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| s == 0.0));
    assert_eq!(finishes.load(Ordering::SeqCst), 1);

    mixer::quit();
}

#[test]
fn loop_callback_fires_on_each_rewind() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    let loops = Arc::new(AtomicUsize::new(0));
    // Exactly two callbacks worth of samples per pass.
    let stream = Stream::new(Box::new(FiniteDecoder::new(0.5, 4096, 44_100, 2)));
    stream.open().unwrap();
    let counter = loops.clone();
    stream.set_loop_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    stream.play(0, NO_FADE).unwrap();

    // Steady state for an infinite loop: every callback is filled entirely.
    for _ in 0..9 {
        let mix = handle.pull_floats(&spec);
        assert!(mix.iter().all(|&s| s == 0.5));
    }
    // Passes end inside callbacks 3, 5, 7, and 9.
    assert_eq!(loops.load(Ordering::SeqCst), 4);
    assert!(stream.is_playing());

    mixer::quit();
}

#[test]
fn volume_scales_and_mute_silences() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    let stream = Stream::new(Box::new(ConstDecoder::new(1.0, 44_100, 2)));
    stream.open().unwrap();
    stream.set_volume(0.25);
    stream.play(0, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| (s - 0.25).abs() < 1e-6));

    stream.mute();
    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| s == 0.0));

    stream.unmute();
    stream.set_volume(0.0);
    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| s == 0.0));

    mixer::quit();
}

#[test]
fn two_streams_mix_additively() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    let a = Stream::new(Box::new(ConstDecoder::new(0.25, 44_100, 2)));
    let b = Stream::new(Box::new(ConstDecoder::new(0.5, 44_100, 2)));
    a.open().unwrap();
    b.open().unwrap();
    a.play(0, NO_FADE).unwrap();
    b.play(0, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| (s - 0.75).abs() < 1e-6));

    // Stopping one leaves the other.
    a.stop(NO_FADE).unwrap();
    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| (s - 0.5).abs() < 1e-6));

    mixer::quit();
}

#[test]
fn processors_run_in_insertion_order() {
    let _guard = helpers::mixer_guard();
    let spec = test_spec();
    let handle = init_mixer(spec);

    let stream = Stream::new(Box::new(ConstDecoder::new(1.0, 44_100, 2)));
    stream.open().unwrap();
    // (1.0 * 0.5) + 0.25 = 0.75; the reverse order would give 0.625.
    let gain_id = stream.add_processor(Box::new(GainProcessor(0.5)));
    stream.add_processor(Box::new(OffsetProcessor(0.25)));
    stream.play(0, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| (s - 0.75).abs() < 1e-6));

    // Removing the gain leaves only the offset.
    assert!(stream.remove_processor(gain_id));
    assert!(!stream.remove_processor(gain_id));
    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| (s - 1.25).abs() < 1e-6));

    stream.clear_processors();
    let mix = handle.pull_floats(&spec);
    assert!(mix.iter().all(|&s| (s - 1.0).abs() < 1e-6));

    mixer::quit();
}

#[test]
fn mono_device_folds_stereo_sources() {
    let _guard = helpers::mixer_guard();
    let mut spec = test_spec();
    spec.channels = 1;
    let handle = init_mixer(spec);

    // Stereo source with L=1.0, R=1.0 folds to 1.0 mono.
    let stream = Stream::new(Box::new(ConstDecoder::new(1.0, 44_100, 2)));
    stream.open().unwrap();
    stream.play(0, NO_FADE).unwrap();

    let mix = handle.pull_floats(&spec);
    assert_eq!(mix.len(), 1024);
    assert!(mix.iter().all(|&s| s == 1.0));

    mixer::quit();
}
