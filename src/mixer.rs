//! The top-level mixer: owns the channel pool and source arena, and drives
//! playback either from a real [`Sink`] or from a loopback buffer for
//! testing/headless use.

use tracing::{trace, warn};

use crate::buffered_stream;
use crate::channel::{Channel, PlayRequest, SourceHandle, ANY_CHANNEL};
use crate::decode::DecodeStream;
use crate::effects::{process_in_chunks, EffectGain, IAudioEffect};
use crate::error::MixerError;
use crate::sink::Sink;
use crate::source::AudioSource;

/// Hard cap on sounds layered onto a single channel at once (primary +
/// the one it's cross-fading out of).
pub const MAX_SOUND_PER_CHANNEL: usize = 2;

/// Frames pulled from the decode pipeline per [`crate::decoded_stream`]
/// step. Re-exported here because hosts sizing their own buffers may want
/// it.
pub const CHUNK_FRAMES_DECODER: u32 = 128;

/// Default cross-fade-out duration applied when a [`PlayOptions`] doesn't
/// override `cross_fade_out_secs`.
const DEFAULT_CROSS_FADE_OUT_SECS: f32 = 0.040;

#[derive(Debug, Clone, Copy)]
pub struct MixerOptions {
    pub sample_rate: u32,
    pub num_channels: usize,
    pub master_volume: f32,
}

impl Default for MixerOptions {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            num_channels: 32,
            master_volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlayOptions {
    /// `ANY_CHANNEL` to let the mixer pick the first idle channel.
    pub channel: i32,
    pub volume: f32,
    pub pan: f32,
    /// `LOOP_FOREVER` or a positive loop count.
    pub loop_count: i32,
    /// Silence before this sound's first sample, in seconds. Mutually
    /// exclusive with `start_time_secs`.
    pub delay_before_play_secs: f32,
    /// Seeks into the source before the first sample plays (and is the
    /// frame a loop wraps back to), in seconds. Mutually exclusive with
    /// `delay_before_play_secs`.
    pub start_time_secs: f32,
    /// Fade-in applied when this sound starts with nothing actively
    /// playing on its channel (channel idle, or only a still-delayed sound
    /// that was never audible). Has no effect during a true cross-fade.
    pub fade_in_secs: f32,
    /// Fade-in applied to this sound when it cross-fades in over an
    /// actively-playing sound.
    pub cross_fade_in_secs: f32,
    /// Fade-out duration applied to an actively-playing sound this
    /// request displaces — the other half of a cross-fade. Has no effect
    /// when the channel was idle or only held a not-yet-audible sound.
    pub cross_fade_out_secs: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            channel: ANY_CHANNEL,
            volume: 1.0,
            pan: 0.0,
            loop_count: 1,
            delay_before_play_secs: 0.0,
            start_time_secs: 0.0,
            fade_in_secs: 0.0,
            cross_fade_in_secs: 0.0,
            cross_fade_out_secs: DEFAULT_CROSS_FADE_OUT_SECS,
        }
    }
}

/// Owns every channel and every loaded source. Sources and channels live in
/// separate arenas addressed by stable handles/indices, which sidesteps the
/// ownership cycle a `Channel -> Source -> Channel` back-reference would
/// otherwise create: the mix pass borrows `self.channels` and `self.sources`
/// as two disjoint fields instead of going through `Rc`/`Arc`.
pub struct Mixer {
    sample_rate: u32,
    channels: Vec<Channel>,
    sources: Vec<Option<AudioSource>>,
    free_source_slots: Vec<u32>,
    /// Terminal effect in the signal path: runs after every
    /// `master_effects` stage so that user effects always process at unity
    /// master gain and the final loudness knob is the very last thing
    /// applied. `set_master_volume` drives this effect's own smoother
    /// rather than scaling anything upstream.
    master_gain: EffectGain,
    master_effects: Vec<Box<dyn IAudioEffect>>,
    playback_frame: u64,
    /// Subtracted from `playback_frame` when reporting
    /// `playback_time_in_seconds`, to compensate for a host's known output
    /// latency (e.g. a sink's internal buffering delay).
    latency_compensation_frames: u32,
    running: bool,
    errored: Option<MixerError>,
}

impl Mixer {
    pub fn new(options: MixerOptions) -> Self {
        let mut master_gain = EffectGain::new(options.master_volume);
        master_gain.prepare_to_play(options.sample_rate as f32);
        Self {
            sample_rate: options.sample_rate,
            channels: (0..options.num_channels).map(|_| Channel::new()).collect(),
            sources: Vec::new(),
            free_source_slots: Vec::new(),
            master_gain,
            master_effects: Vec::new(),
            playback_frame: 0,
            latency_compensation_frames: 0,
            running: false,
            errored: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Loads `stream` as a playable source. If `stream.realtime_safe()` is
    /// false, it is transparently wrapped with a decode producer thread.
    pub fn add_source(&mut self, stream: Box<dyn DecodeStream>) -> Result<SourceHandle, MixerError> {
        let channels = stream.num_channels();
        if channels != 1 && channels != 2 {
            return Err(MixerError::InvalidChannelCount(channels));
        }
        let wrapped = buffered_stream::wrap(stream);
        let mut source = AudioSource::prepare_to_play(wrapped, self.sample_rate as f32);
        if self.running {
            // A source added after playback has started must never trigger
            // a blocking full decode from inside the audio callback.
            source.disallow_full_decode();
        }

        let handle = if let Some(idx) = self.free_source_slots.pop() {
            self.sources[idx as usize] = Some(source);
            idx
        } else {
            self.sources.push(Some(source));
            (self.sources.len() - 1) as u32
        };
        Ok(SourceHandle(handle))
    }

    /// Eagerly decodes `handle` in full. Only meaningful before playback
    /// starts (or for a source never routed through the audio thread);
    /// a no-op otherwise.
    pub fn preload(&mut self, handle: SourceHandle) {
        if let Some(Some(source)) = self.sources.get_mut(handle.0 as usize) {
            source.full_decode();
        }
    }

    pub fn unload(&mut self, handle: SourceHandle) {
        if let Some(slot) = self.sources.get_mut(handle.0 as usize) {
            *slot = None;
            self.free_source_slots.push(handle.0);
        }
    }

    /// Adds an effect to the master chain, run after every channel has been
    /// mixed down but before the terminal master-gain stage. Order of
    /// calls is processing order.
    pub fn add_master_effect(&mut self, mut effect: Box<dyn IAudioEffect>) {
        effect.prepare_to_play(self.sample_rate as f32);
        self.master_effects.push(effect);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_gain.set_parameter("Gain", volume.max(0.0));
    }

    pub fn master_volume(&self) -> f32 {
        self.master_gain.get_parameter("Gain").unwrap_or(1.0)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Whether the mixer has latched into an errored state (see
    /// [`Self::last_error_string`]). Once errored, `generate` emits
    /// silence until the mixer is recreated.
    pub fn is_errored(&self) -> bool {
        self.errored.is_some()
    }

    /// Human-readable description of the error the mixer latched on, if
    /// any.
    pub fn last_error_string(&self) -> Option<String> {
        self.errored.as_ref().map(|e| e.to_string())
    }

    /// Sets a fixed frame offset subtracted from the running playback
    /// clock, to compensate for a sink's known output latency.
    pub fn set_latency_compensation_frames(&mut self, frames: u32) {
        self.latency_compensation_frames = frames;
    }

    fn secs_to_frames(&self, secs: f32) -> u32 {
        (secs.max(0.0) * self.sample_rate as f32).round() as u32
    }

    /// Plays `handle` per `opts`. Returns the channel index it landed on,
    /// or `None` if the command was silently dropped (requested
    /// `ANY_CHANNEL` but every channel was busy).
    pub fn play(&mut self, handle: SourceHandle, opts: PlayOptions) -> Result<Option<usize>, MixerError> {
        if opts.delay_before_play_secs > 0.0 && opts.start_time_secs > 0.0 {
            return Err(MixerError::ConflictingPlayOffsets);
        }
        let Some(idx) = self.resolve_channel(opts.channel)? else {
            return Ok(None);
        };
        self.start_on_channel(idx, handle, opts);
        Ok(Some(idx))
    }

    /// Starts several sounds in lockstep on distinct channels, guaranteeing
    /// they begin on the exact same output frame. Each request's own
    /// `PlayOptions` is validated and resolved independently; an `ANY_CHANNEL`
    /// request with no idle channel left shows up as `None` at its index
    /// rather than aborting the whole batch.
    pub fn play_simultaneously(
        &mut self,
        requests: &[(SourceHandle, PlayOptions)],
    ) -> Result<Vec<Option<usize>>, MixerError> {
        let mut landed = Vec::with_capacity(requests.len());
        for (handle, opts) in requests {
            landed.push(self.play(*handle, *opts)?);
        }
        Ok(landed)
    }

    /// Resolves a requested channel index. `ANY_CHANNEL` picks the first
    /// idle channel, or `Ok(None)` (drop the command) if none is idle; an
    /// explicit index is validated against the channel count.
    fn resolve_channel(&self, requested: i32) -> Result<Option<usize>, MixerError> {
        if requested == ANY_CHANNEL {
            Ok(self.channels.iter().position(|c| c.is_idle()))
        } else if requested >= 0 && (requested as usize) < self.channels.len() {
            Ok(Some(requested as usize))
        } else {
            Err(MixerError::InvalidChannelIndex(requested))
        }
    }

    fn start_on_channel(&mut self, idx: usize, handle: SourceHandle, opts: PlayOptions) {
        self.channels[idx].start_playing(PlayRequest {
            source: handle,
            volume: opts.volume,
            pan: opts.pan,
            loop_count: opts.loop_count,
            delay_frames: self.secs_to_frames(opts.delay_before_play_secs),
            start_offset_frames: self.secs_to_frames(opts.start_time_secs),
            fade_in_frames: self.secs_to_frames(opts.fade_in_secs),
            cross_fade_in_frames: self.secs_to_frames(opts.cross_fade_in_secs),
            cross_fade_out_frames: self.secs_to_frames(opts.cross_fade_out_secs),
        });
    }

    pub fn stop_channel(&mut self, idx: usize, fade_out_frames: u32) -> Result<(), MixerError> {
        if idx >= self.channels.len() {
            return Err(MixerError::InvalidChannelIndex(idx as i32));
        }
        self.channels[idx].stop(fade_out_frames);
        Ok(())
    }

    pub fn set_channel_volume(&mut self, idx: usize, volume: f32) -> Result<(), MixerError> {
        if idx >= self.channels.len() {
            return Err(MixerError::InvalidChannelIndex(idx as i32));
        }
        self.channels[idx].set_volume(volume);
        Ok(())
    }

    pub fn playback_time_in_seconds(&self) -> f64 {
        let frame = self
            .playback_frame
            .saturating_sub(self.latency_compensation_frames as u64);
        frame as f64 / self.sample_rate as f64
    }

    /// Starts real-time output through `sink`. The sink's own callback
    /// thread drives every subsequent call to [`Self::generate`].
    pub fn run(mut self, mut sink: Box<dyn Sink>) -> Result<(), MixerError> {
        if sink.sample_rate() != self.sample_rate {
            return Err(MixerError::FormatUnsupported);
        }
        self.running = true;
        sink.start(Box::new(move |out: &mut [f32]| {
            let frames = out.len() / 2;
            self.generate(frames, out);
        }))
    }

    /// Renders `frames` stereo frames into `out` (interleaved, length
    /// `frames * 2`). This is the real-time entry point: it must never
    /// block, allocate unboundedly, or log beyond `trace!`.
    pub fn generate(&mut self, frames: usize, out: &mut [f32]) {
        debug_assert_eq!(out.len(), frames * 2);
        out.fill(0.0);

        if self.errored.is_some() {
            warn!("mixer generate() called while in errored state; emitting silence");
            return;
        }

        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; frames];

        for channel in &mut self.channels {
            let mut dst = [vec![0.0f32; frames], vec![0.0f32; frames]];
            channel.produce_sound(&mut self.sources, &mut dst, frames as u32);
            for i in 0..frames {
                left[i] += dst[0][i];
                right[i] += dst[1][i];
            }
        }

        let mut interleaved = vec![0.0f32; frames * 2];
        for i in 0..frames {
            interleaved[i * 2] = left[i];
            interleaved[i * 2 + 1] = right[i];
        }

        for effect in &mut self.master_effects {
            process_in_chunks(effect.as_mut(), &mut interleaved, frames);
        }
        // Terminal stage: overall master volume, smoothed, applied after
        // every user-supplied master effect.
        process_in_chunks(&mut self.master_gain, &mut interleaved, frames);

        out.copy_from_slice(&interleaved);
        self.playback_frame += frames as u64;
        trace!(frames, "generated audio block");
    }

    /// Renders into a plain `Vec<f32>`, growing it to `frames * 2` first.
    /// Convenient for tests and headless hosts that don't want to implement
    /// [`Sink`] just to drive the mixer.
    pub fn loopback_generate(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * 2];
        self.generate(frames, &mut out);
        out
    }

    /// Like [`Self::loopback_generate`] but mixes into an existing buffer
    /// instead of replacing it (for a host compositing the mixer's output
    /// with something else).
    pub fn loopback_mix(&mut self, frames: usize, dst: &mut [f32]) {
        debug_assert_eq!(dst.len(), frames * 2);
        let rendered = self.loopback_generate(frames);
        for (d, s) in dst.iter_mut().zip(rendered.iter()) {
            *d += s;
        }
    }
}
