//! Fade envelope
//!
//! Each stream carries an internal fade volume in [0.0, 1.0], multiplied
//! into the user volume at mix time. Fades are time-based on a monotonic
//! clock and follow a cubic curve, which reads as a smooth level change:
//! fade-in is `(t/D)^3`, fade-out is `(1 - t/D)^3`.

use std::time::{Duration, Instant};

/// What the envelope asks the stream to do after processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeStep {
    /// Keep playing
    Continue,
    /// Fade-out finished with stop-after-fade set
    FinishStop,
    /// Fade-out finished without it
    FinishPause,
}

/// Per-stream fade state
#[derive(Debug)]
pub(crate) struct Fade {
    fading_in: bool,
    fading_out: bool,
    stop_after_fade: bool,
    fade_in_duration: Duration,
    fade_out_duration: Duration,
    fade_in_start: Instant,
    fade_out_start: Instant,
    gain: f32,
}

impl Fade {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            fading_in: false,
            fading_out: false,
            stop_after_fade: false,
            fade_in_duration: Duration::ZERO,
            fade_out_duration: Duration::ZERO,
            fade_in_start: now,
            fade_out_start: now,
            gain: 1.0,
        }
    }

    /// Current envelope value
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Start a fade from silence to full volume
    ///
    /// A zero duration transitions immediately.
    pub fn begin_fade_in(&mut self, duration: Duration, now: Instant) {
        self.fading_out = false;
        self.stop_after_fade = false;
        if duration.is_zero() {
            self.fading_in = false;
            self.gain = 1.0;
            return;
        }
        self.fading_in = true;
        self.fade_in_duration = duration;
        self.fade_in_start = now;
        self.gain = 0.0;
    }

    /// Start a fade from full volume to silence
    ///
    /// `stop_after` selects whether completion stops or pauses the stream.
    /// A zero duration completes on the next [`Fade::process`] call.
    pub fn begin_fade_out(&mut self, duration: Duration, stop_after: bool, now: Instant) {
        self.fading_in = false;
        self.fading_out = true;
        self.stop_after_fade = stop_after;
        self.fade_out_duration = duration;
        self.fade_out_start = now;
    }

    /// Snap to full volume, cancelling any fade
    pub fn reset_full(&mut self) {
        self.fading_in = false;
        self.fading_out = false;
        self.stop_after_fade = false;
        self.gain = 1.0;
    }

    /// Whether a fade-out is still running
    pub fn is_fading_out(&self) -> bool {
        self.fading_out
    }

    /// Advance the envelope to `now`
    pub fn process(&mut self, now: Instant) -> FadeStep {
        if self.fading_in {
            let elapsed = now.saturating_duration_since(self.fade_in_start);
            if elapsed >= self.fade_in_duration {
                self.gain = 1.0;
                self.fading_in = false;
            } else {
                let ratio = elapsed.as_secs_f32() / self.fade_in_duration.as_secs_f32();
                self.gain = ratio.powi(3);
            }
            FadeStep::Continue
        } else if self.fading_out {
            let elapsed = now.saturating_duration_since(self.fade_out_start);
            if elapsed >= self.fade_out_duration {
                self.gain = 0.0;
                self.fading_out = false;
                if self.stop_after_fade {
                    self.stop_after_fade = false;
                    FadeStep::FinishStop
                } else {
                    FadeStep::FinishPause
                }
            } else {
                let ratio = elapsed.as_secs_f32() / self.fade_out_duration.as_secs_f32();
                self.gain = (1.0 - ratio).powi(3);
                FadeStep::Continue
            }
        } else {
            FadeStep::Continue
        }
    }
}
