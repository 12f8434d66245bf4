//! Property-based tests for the mix path

mod helpers;

use helpers::{init_mixer, test_spec, ConstDecoder};
use polymix_playback::{mixer, Stream};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: for any volume and stereo position the mix is finite, and
    /// each channel equals the source scaled by the documented gain law.
    #[test]
    fn gain_law_holds(
        volume in 0.0f32..2.0,
        position in -1.0f32..=1.0,
        value in -1.0f32..=1.0,
    ) {
        let _guard = helpers::mixer_guard();
        let spec = test_spec();
        let handle = init_mixer(spec);

        let stream = Stream::new(Box::new(ConstDecoder::new(value, 44_100, 2)));
        stream.open().unwrap();
        stream.set_volume(volume);
        stream.set_stereo_position(position);
        stream.play(0, Duration::ZERO).unwrap();

        let mix = handle.pull_floats(&spec);
        mixer::quit();

        let mut expected_left = volume;
        let mut expected_right = volume;
        if position < 0.0 {
            expected_right *= 1.0 + position;
        } else if position > 0.0 {
            expected_left *= 1.0 - position;
        }

        for frame in mix.chunks_exact(2) {
            prop_assert!(frame[0].is_finite() && frame[1].is_finite());
            prop_assert!((frame[0] - value * expected_left).abs() < 1e-5);
            prop_assert!((frame[1] - value * expected_right).abs() < 1e-5);
        }
    }

    /// Property: the callback always fills exactly the requested bytes,
    /// whatever the buffer size.
    #[test]
    fn callback_fills_any_buffer_size(frames in 1usize..4096) {
        let _guard = helpers::mixer_guard();
        let spec = test_spec();
        let handle = init_mixer(spec);

        let stream = Stream::new(Box::new(ConstDecoder::new(1.0, 44_100, 2)));
        stream.open().unwrap();
        stream.play(0, Duration::ZERO).unwrap();

        // A device that changes its mind about the buffer size mid-flight.
        let mut bytes = vec![0u8; frames * 2 * 4];
        handle.run_callback(&mut bytes);
        let mix = helpers::floats_from_le(&bytes);
        mixer::quit();

        prop_assert_eq!(mix.len(), frames * 2);
        for s in mix {
            prop_assert_eq!(s, 1.0);
        }
    }
}
