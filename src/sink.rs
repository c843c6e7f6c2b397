//! The output side of the mixer: anything that can deliver a stream of
//! interleaved stereo frames to real speakers (or a test loopback).

use crate::error::MixerError;

/// A real-time audio output device.
///
/// [`Mixer::run`](crate::mixer::Mixer::run) calls [`Sink::start`] once with
/// a closure that fills each requested buffer; the sink is responsible for
/// calling it from whatever thread its backend's audio callback runs on.
pub trait Sink: Send {
    /// The sample rate this sink was opened at. The mixer resamples every
    /// source to this rate.
    fn sample_rate(&self) -> u32;

    /// Starts output, invoking `write` once per audio-callback period with
    /// an interleaved-stereo buffer to fill. `write` must not block for
    /// long or allocate; it is called from the device's real-time thread.
    fn start(&mut self, write: Box<dyn FnMut(&mut [f32]) + Send>) -> Result<(), MixerError>;
}
