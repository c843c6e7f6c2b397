//! Fixed-size channel pool: each [`Channel`] can hold up to two
//! [`SoundSlot`]s so that starting a new sound cross-fades out of an
//! actively-playing one instead of cutting it off.

use crate::source::AudioSource;

/// Opaque handle into the mixer's source arena. Channels never hold a
/// reference to an [`AudioSource`] directly — only this index — so the
/// mixer can keep `channels` and `sources` as separate arenas and borrow
/// them independently during the mix pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u32);

/// Special channel index accepted by [`crate::mixer::Mixer::play`] meaning
/// "pick any channel currently idle".
pub const ANY_CHANNEL: i32 = -1;

/// Passed as a sound's loop count to mean "loop forever".
pub const LOOP_FOREVER: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeState {
    Idle,
    FadingIn,
    Constant,
    FadingOut,
}

struct SoundSlot {
    source: Option<SourceHandle>,
    state: FadeState,
    volume: f32,
    pan: f32,
    loops_remaining: i32,
    cursor: u32,
    /// Frame offset into the source this slot seeks to on start, and wraps
    /// back to on every loop — not always zero when
    /// `PlayRequest::start_offset_frames` was non-zero.
    start_offset: u32,
    delay_frames: u32,
    fade_total: u32,
    fade_remaining: u32,
}

impl SoundSlot {
    fn new() -> Self {
        Self {
            source: None,
            state: FadeState::Idle,
            volume: 1.0,
            pan: 0.0,
            loops_remaining: 0,
            cursor: 0,
            start_offset: 0,
            delay_frames: 0,
            fade_total: 0,
            fade_remaining: 0,
        }
    }

    fn is_idle(&self) -> bool {
        self.state == FadeState::Idle
    }

    /// Non-idle and already past its delayed-start, i.e. actually
    /// contributing audio right now.
    fn is_playing(&self) -> bool {
        !self.is_idle() && self.delay_frames == 0
    }
}

/// Request to start a new sound on a channel.
pub struct PlayRequest {
    pub source: SourceHandle,
    pub volume: f32,
    pub pan: f32,
    /// `LOOP_FOREVER` or a positive loop count.
    pub loop_count: i32,
    pub delay_frames: u32,
    /// Frame offset into the source to seek to before the first sample
    /// plays (and to wrap back to on loop), instead of always starting at
    /// frame 0.
    pub start_offset_frames: u32,
    /// Fade-in applied to this sound when it's simply starting on a
    /// channel with nothing actively playing (the channel was idle, or
    /// only held a still-delayed sound that hadn't made a sound yet).
    pub fade_in_frames: u32,
    /// Fade-in applied to this sound when it displaces an
    /// actively-playing sound — a true cross-fade.
    pub cross_fade_in_frames: u32,
    /// Fade-out applied to the actively-playing sound this request
    /// displaces. Only used in the true cross-fade case.
    pub cross_fade_out_frames: u32,
}

/// One mixing channel: up to two overlapping sounds (current + the one
/// it's cross-fading out of), a pan and an overall channel volume.
pub struct Channel {
    slots: [SoundSlot; 2],
    /// Index into `slots` of the currently "primary" (most recently
    /// started) sound.
    active: usize,
    volume: f32,
}

impl Channel {
    pub fn new() -> Self {
        Self {
            slots: [SoundSlot::new(), SoundSlot::new()],
            active: 0,
            volume: 1.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.slots[0].is_idle() && self.slots[1].is_idle()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Starts `req` on this channel.
    ///
    /// 1. If the active slot is idle, just occupy it with `fade_in_frames`
    ///    — nothing to cross-fade against.
    /// 2. If the active slot is actively playing (already audible), rotate
    ///    it into the other slot to fade out over `cross_fade_out_frames`
    ///    while the new sound takes over the active slot, fading in over
    ///    `cross_fade_in_frames` — a true cross-fade.
    /// 3. Otherwise the active slot is merely *pending* (non-idle but
    ///    still inside its own delayed start, so never actually heard):
    ///    stop it immediately and occupy it with `fade_in_frames`, since
    ///    there is no audible overlap to cross-fade against.
    pub fn start_playing(&mut self, req: PlayRequest) {
        let fade_in = req.fade_in_frames;
        let cross_fade_in = req.cross_fade_in_frames;
        let cross_fade_out = req.cross_fade_out_frames;

        if self.slots[self.active].is_idle() {
            self.occupy(self.active, req, fade_in);
            return;
        }

        if self.slots[self.active].is_playing() {
            let retiring = self.active;
            let incoming = 1 - self.active;
            self.slots[incoming] = SoundSlot::new();

            if cross_fade_out == 0 {
                self.slots[retiring] = SoundSlot::new();
                self.occupy(retiring, req, cross_fade_in);
                return;
            }

            self.slots[retiring].state = FadeState::FadingOut;
            self.slots[retiring].fade_total = cross_fade_out;
            self.slots[retiring].fade_remaining = cross_fade_out;

            self.occupy(incoming, req, cross_fade_in);
            self.active = incoming;
            return;
        }

        // Active slot is pending (delayed, never yet audible): nothing to
        // cross-fade against, so replace it outright.
        self.occupy(self.active, req, fade_in);
    }

    fn occupy(&mut self, slot: usize, req: PlayRequest, fade_total: u32) {
        self.slots[slot] = SoundSlot {
            source: Some(req.source),
            state: if fade_total > 0 {
                FadeState::FadingIn
            } else {
                FadeState::Constant
            },
            volume: req.volume,
            pan: req.pan,
            loops_remaining: req.loop_count,
            cursor: req.start_offset_frames,
            start_offset: req.start_offset_frames,
            delay_frames: req.delay_frames,
            fade_total,
            fade_remaining: fade_total,
        };
    }

    /// Fades out everything currently playing on this channel over
    /// `fade_frames` (0 = stop immediately).
    pub fn stop(&mut self, fade_frames: u32) {
        for slot in &mut self.slots {
            if slot.is_idle() {
                continue;
            }
            if fade_frames == 0 {
                *slot = SoundSlot::new();
            } else {
                slot.state = FadeState::FadingOut;
                slot.fade_total = fade_frames;
                slot.fade_remaining = fade_frames;
            }
        }
    }

    /// Equal-power pan law: constant perceived loudness as `pan` sweeps
    /// from -1 (left) to +1 (right).
    fn pan_gains(volume: f32, pan: f32) -> (f32, f32) {
        let theta = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
        let root_two = std::f32::consts::SQRT_2;
        (volume * theta.cos() * root_two, volume * theta.sin() * root_two)
    }

    /// Mixes `frames` frames of this channel's slots into `dst[0]`/`dst[1]`
    /// (stereo), pulling source audio from `sources` by handle. Slots that
    /// finish (source exhausted with no loops left, or a fade-out
    /// completes) are reset to idle. This channel's own volume (set via
    /// [`Self::set_volume`]) is applied here; overall master volume is the
    /// mixer's job, applied once after every channel has been summed.
    pub fn produce_sound(
        &mut self,
        sources: &mut [Option<AudioSource>],
        dst: &mut [Vec<f32>; 2],
        frames: u32,
    ) {
        let channel_volume = self.volume;
        for slot_idx in 0..2 {
            self.produce_slot(slot_idx, sources, dst, frames, channel_volume);
        }
    }

    fn produce_slot(
        &mut self,
        slot_idx: usize,
        sources: &mut [Option<AudioSource>],
        dst: &mut [Vec<f32>; 2],
        frames: u32,
        channel_volume: f32,
    ) {
        if self.slots[slot_idx].is_idle() {
            return;
        }
        let Some(SourceHandle(handle)) = self.slots[slot_idx].source else {
            return;
        };
        let Some(Some(source)) = sources.get_mut(handle as usize) else {
            self.slots[slot_idx] = SoundSlot::new();
            return;
        };

        let mut produced = 0u32;

        // Delayed start: the slot contributes silence until its delay has
        // elapsed within this callback.
        if self.slots[slot_idx].delay_frames > 0 {
            let skip = self.slots[slot_idx].delay_frames.min(frames);
            self.slots[slot_idx].delay_frames -= skip;
            produced = skip;
            if skip == frames {
                return;
            }
        }

        let remaining = frames - produced;
        if remaining == 0 {
            return;
        }

        let mut ramp = vec![0.0f32; remaining as usize];
        let mut finished_fade = false;

        for (i, r) in ramp.iter_mut().enumerate() {
            *r = match self.slots[slot_idx].state {
                FadeState::Constant => 1.0,
                FadeState::FadingIn => {
                    let total = self.slots[slot_idx].fade_total.max(1);
                    let elapsed = total - self.slots[slot_idx].fade_remaining + i as u32;
                    (elapsed as f32 / total as f32).min(1.0)
                }
                FadeState::FadingOut => {
                    let total = self.slots[slot_idx].fade_total.max(1);
                    let elapsed = total - self.slots[slot_idx].fade_remaining + i as u32;
                    if elapsed >= total {
                        finished_fade = true;
                        0.0
                    } else {
                        1.0 - elapsed as f32 / total as f32
                    }
                }
                FadeState::Idle => 0.0,
            };
        }

        let (vol_l, vol_r) = Self::pan_gains(
            self.slots[slot_idx].volume * channel_volume,
            self.slots[slot_idx].pan,
        );

        // Keep mixing across the rest of this block even if the source
        // wraps (loops) or is displaced partway through: a source shorter
        // than one callback must not leave the tail of the block silent.
        let mut filled = 0u32;
        while filled < remaining {
            let want = remaining - filled;
            let cursor = self.slots[slot_idx].cursor;
            let ramp_slice = &ramp[filled as usize..(filled + want) as usize];

            let mut scratch = [vec![0.0f32; want as usize], vec![0.0f32; want as usize]];
            let got = source.mix_into_buffer(&mut scratch, cursor, want, ramp_slice, 1.0);

            for i in 0..got as usize {
                let dst_idx = (produced + filled) as usize + i;
                dst[0][dst_idx] += scratch[0][i] * vol_l;
                dst[1][dst_idx] += scratch[1][i] * vol_r;
            }

            self.slots[slot_idx].cursor += got;
            filled += got;

            if !source.is_finished_at(self.slots[slot_idx].cursor) {
                if got == 0 {
                    // No progress and not finished: stop rather than spin.
                    break;
                }
                continue;
            }

            let looping = self.slots[slot_idx].loops_remaining == LOOP_FOREVER
                || self.slots[slot_idx].loops_remaining > 1;
            if looping {
                if self.slots[slot_idx].loops_remaining > 0 {
                    self.slots[slot_idx].loops_remaining -= 1;
                }
                self.slots[slot_idx].cursor = self.slots[slot_idx].start_offset;
                continue;
            }

            self.slots[slot_idx] = SoundSlot::new();
            return;
        }

        if finished_fade {
            self.slots[slot_idx] = SoundSlot::new();
        } else if self.slots[slot_idx].state == FadeState::FadingIn {
            let total = self.slots[slot_idx].fade_total;
            let new_remaining = self.slots[slot_idx].fade_remaining.saturating_sub(remaining);
            self.slots[slot_idx].fade_remaining = new_remaining;
            if new_remaining == 0 && total > 0 {
                self.slots[slot_idx].state = FadeState::Constant;
            }
        } else if self.slots[slot_idx].state == FadeState::FadingOut {
            self.slots[slot_idx].fade_remaining =
                self.slots[slot_idx].fade_remaining.saturating_sub(remaining);
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}
