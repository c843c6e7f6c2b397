use super::{IAudioEffect, Parameter};

/// Time constant for the gain smoother. Fast enough to track a parameter
/// change within a couple of effect blocks, slow enough to never click.
const SMOOTHING_TAU_SECONDS: f32 = 0.015;

/// A master gain stage with a one-pole exponential smoother on the target
/// volume, so changing `gain` mid-stream never produces a zipper click.
pub struct EffectGain {
    gain: Parameter,
    current: f32,
    exp_factor: f32,
}

impl EffectGain {
    pub fn new(initial_gain: f32) -> Self {
        Self {
            gain: Parameter::new(initial_gain, 0.0, 1.0),
            current: initial_gain,
            exp_factor: 1.0,
        }
    }
}

impl IAudioEffect for EffectGain {
    fn prepare_to_play(&mut self, sample_rate: f32) {
        self.exp_factor = 1.0 - (-1.0 / (SMOOTHING_TAU_SECONDS * sample_rate)).exp();
        self.current = self.gain.get();
    }

    fn process_audio(&mut self, buffer: &mut [f32], frames: usize) {
        let target = self.gain.get();
        for frame in 0..frames {
            self.current += (target - self.current) * self.exp_factor;
            buffer[frame * 2] *= self.current;
            buffer[frame * 2 + 1] *= self.current;
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        if name == "Gain" {
            self.gain.set(value);
        }
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        (name == "Gain").then(|| self.gain.get())
    }
}
