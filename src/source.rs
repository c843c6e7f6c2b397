//! A loaded, playable audio asset.

use crate::decode::DecodeStream;
use crate::decoded_stream::DecodedStream;

/// Frames decoded per iteration of [`AudioSource::full_decode`].
const FULL_DECODE_CHUNK_FRAMES: u32 = 32;

/// An audio asset prepared for playback by the mixer.
///
/// Wraps a [`DecodedStream`] and tracks whether this source is allowed to
/// be fully decoded up front (see [`AudioSource::full_decode`]) — sources
/// created after the mixer has started running real-time playback should
/// not trigger a blocking full decode from the audio thread.
pub struct AudioSource {
    decoded: DecodedStream,
    disallow_full_decode: bool,
    original_length_in_frames: Option<i64>,
}

impl AudioSource {
    /// Wraps `stream` (already buffered via [`crate::buffered_stream::wrap`]
    /// if it isn't realtime-safe) for playback at `mixer_rate`.
    pub fn prepare_to_play(stream: Box<dyn DecodeStream>, mixer_rate: f32) -> Self {
        let original_length_in_frames = stream.length_in_frames();
        Self {
            decoded: DecodedStream::new(stream, mixer_rate),
            disallow_full_decode: false,
            original_length_in_frames,
        }
    }

    /// Marks this source as ineligible for [`Self::full_decode`] — used for
    /// sources prepared after the mixer is already running, where a
    /// blocking decode loop would stall the audio thread.
    pub fn disallow_full_decode(&mut self) {
        self.disallow_full_decode = true;
    }

    /// Eagerly decodes the entire source by repeatedly mixing small
    /// throwaway stereo buffers until the stream reports finished. Useful
    /// for preloading short one-shot sounds so the first real playback
    /// never touches the producer thread's ring buffer.
    ///
    /// No-op (and does not block) if [`Self::disallow_full_decode`] was
    /// called, or if the source has no known length.
    pub fn full_decode(&mut self) {
        if self.disallow_full_decode {
            return;
        }
        let mut scratch = vec![vec![0.0f32; FULL_DECODE_CHUNK_FRAMES as usize]; 2];
        let ramp = vec![0.0f32; FULL_DECODE_CHUNK_FRAMES as usize];
        let mut frame = 0u32;
        loop {
            for buf in &mut scratch {
                buf.iter_mut().for_each(|s| *s = 0.0);
            }
            let got = self
                .decoded
                .mix_into_buffer(&mut scratch, frame, FULL_DECODE_CHUNK_FRAMES, &ramp, 0.0);
            frame += got;
            if self.decoded.is_finished_at(frame) || got == 0 {
                break;
            }
        }
    }

    pub fn mix_into_buffer(
        &mut self,
        dst: &mut [Vec<f32>],
        start_frame: u32,
        frames: u32,
        volume_ramp: &[f32],
        volume: f32,
    ) -> u32 {
        self.decoded
            .mix_into_buffer(dst, start_frame, frames, volume_ramp, volume)
    }

    pub fn is_finished_at(&self, frame: u32) -> bool {
        self.decoded.is_finished_at(frame)
    }

    pub fn num_channels(&self) -> u16 {
        self.decoded.num_channels()
    }

    pub fn sample_rate(&self) -> f32 {
        self.decoded.mixer_rate()
    }

    /// Length at the mixer's own sample rate, once fully decoded; `None`
    /// until then.
    pub fn length_in_frames(&self) -> Option<u32> {
        if self.decoded.is_finished_at(self.decoded.decoded_len()) {
            Some(self.decoded.decoded_len())
        } else {
            None
        }
    }

    pub fn length_in_seconds(&self) -> Option<f32> {
        self.length_in_frames()
            .map(|f| f as f32 / self.decoded.mixer_rate())
    }

    /// Length as reported by the original decoder, at the decoder's own
    /// sample rate — before resampling to mixer rate.
    pub fn original_length_in_frames(&self) -> Option<i64> {
        self.original_length_in_frames
    }
}

#[cfg(test)]
mod tests;
