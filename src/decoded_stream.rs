//! Resampled, chunk-buffered view of a [`DecodeStream`].
//!
//! `DecodedStream` owns one [`Resampler`] per source channel and decodes
//! ahead into a pair of [`ChunkedVec<f32>`] buffers at the mixer's own
//! sample rate. Consumers (see [`crate::source::AudioSource`]) ask for
//! frames by absolute index via [`DecodedStream::mix_into_buffer`]; any
//! frames not yet decoded are produced on demand.

use crate::chunked_vec::ChunkedVec;
use crate::decode::DecodeStream;
use crate::resample::{Quality, Resampler};

/// Frames pulled from the underlying stream per decode step.
const CHUNK_FRAMES_DECODER: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    DecodingFromStream,
    FlushingResamplerTail,
    Terminated,
}

pub struct DecodedStream {
    stream: Box<dyn DecodeStream>,
    src_channels: u16,
    mixer_rate: f32,
    resamplers: Vec<Resampler>,
    /// One chunked buffer per output channel (1 or 2), at mixer rate.
    decoded: Vec<ChunkedVec<f32>>,
    state: State,
    scratch_in: Vec<f32>,
}

impl DecodedStream {
    pub fn new(stream: Box<dyn DecodeStream>, mixer_rate: f32) -> Self {
        let src_channels = stream.num_channels();
        let src_rate = stream.sample_rate() as f64;
        let resamplers = (0..src_channels)
            .map(|_| Resampler::new(src_rate, mixer_rate as f64, Quality::Cubic))
            .collect();
        let decoded = (0..src_channels)
            .map(|_| ChunkedVec::new(1024))
            .collect();
        Self {
            stream,
            src_channels,
            mixer_rate,
            resamplers,
            decoded,
            state: State::DecodingFromStream,
            scratch_in: vec![0.0; CHUNK_FRAMES_DECODER as usize * src_channels.max(1) as usize],
        }
    }

    pub fn num_channels(&self) -> u16 {
        self.src_channels
    }

    pub fn mixer_rate(&self) -> f32 {
        self.mixer_rate
    }

    /// Number of frames already decoded and resampled into buffer.
    pub fn decoded_len(&self) -> u32 {
        self.decoded[0].len()
    }

    /// Ensures at least `up_to_frame` (exclusive end) frames are available
    /// in `self.decoded`, decoding more from the stream as needed.
    fn decode_more_samples(&mut self, up_to_frame: u32) {
        while self.decoded_len() < up_to_frame && self.state != State::Terminated {
            match self.state {
                State::DecodingFromStream => {
                    let frames_read = self
                        .stream
                        .read_samples_float(&mut self.scratch_in, CHUNK_FRAMES_DECODER as usize);
                    for ch in 0..self.src_channels as usize {
                        let mut mono = Vec::with_capacity(frames_read);
                        for f in 0..frames_read {
                            mono.push(self.scratch_in[f * self.src_channels as usize + ch]);
                        }
                        self.resamplers[ch].push(&mono);
                    }
                    if frames_read < CHUNK_FRAMES_DECODER as usize {
                        self.state = State::FlushingResamplerTail;
                    }
                    self.drain_resamplers();
                }
                State::FlushingResamplerTail => {
                    let flush_len = 4 * crate::resample::SINC_HALF_WIDTH;
                    let silence = vec![0.0f32; flush_len];
                    for r in &mut self.resamplers {
                        r.push(&silence);
                    }
                    self.drain_resamplers();
                    self.state = State::Terminated;
                }
                State::Terminated => unreachable!(),
            }
        }
    }

    fn drain_resamplers(&mut self) {
        let mut scratch = Vec::new();
        for ch in 0..self.src_channels as usize {
            self.resamplers[ch].pull(&mut scratch);
            for &s in &scratch {
                self.decoded[ch].push_back(s);
            }
            scratch.clear();
        }
    }

    /// Mixes `frames` frames starting at `start_frame` (mixer-rate absolute
    /// index) into `dst[channel]`, applying `volume_ramp` and `volume`.
    /// Returns the number of frames actually available (may be less than
    /// `frames` at end-of-stream); frames beyond that are left untouched.
    pub fn mix_into_buffer(
        &mut self,
        dst: &mut [Vec<f32>],
        start_frame: u32,
        frames: u32,
        volume_ramp: &[f32],
        volume: f32,
    ) -> u32 {
        self.decode_more_samples(start_frame + frames);
        let available = self.decoded_len().saturating_sub(start_frame).min(frames);
        if available == 0 {
            return 0;
        }
        let out_channels = dst.len();
        for out_ch in 0..out_channels {
            let src_ch = if self.src_channels as usize == 1 {
                0
            } else {
                out_ch.min(self.src_channels as usize - 1)
            };
            self.decoded[src_ch].mix_into(
                &mut dst[out_ch][..available as usize],
                start_frame,
                &volume_ramp[..available as usize],
                volume,
            );
        }
        available
    }

    pub fn is_finished_at(&self, frame: u32) -> bool {
        self.state == State::Terminated && frame >= self.decoded_len()
    }
}

#[cfg(test)]
mod tests;
