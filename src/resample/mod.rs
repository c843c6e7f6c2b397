//! Per-channel sample-rate conversion.
//!
//! A [`Resampler`] is push-then-pull: [`Resampler::push`] feeds newly
//! decoded input samples and internally produces as much output as the
//! buffered input allows; [`Resampler::pull`] drains the produced samples
//! into a caller-owned buffer. Feeding silence (zeros) after the real input
//! is exhausted flushes the filter's tail, matching how `DecodedStream`'s
//! `FlushingResamplerTail` state works (§4.4 of the design doc).

mod tables;

use std::collections::VecDeque;

pub use tables::{CUBIC_RESOLUTION, SINC_HALF_WIDTH, SINC_RESOLUTION};

/// Interpolation quality. Higher qualities cost more CPU and more latency
/// (see [`Quality::input_delay`] / [`Quality::output_delay`]) in exchange
/// for a cleaner stopband.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// Output = most recent input sample. Cheapest, aliases badly.
    ZeroOrderHold,
    /// Two-tap linear interpolation.
    Linear,
    /// Four-tap Catmull-Rom style cubic interpolation.
    Cubic,
    /// `2*W`-wide windowed-sinc kernel, renormalised for downsampling.
    Sinc,
    /// Bandlimited step synthesis — corrects ZOH discontinuities with a
    /// windowed-sinc residual. Intended for synthetic/impulsive sources.
    Blep,
    /// Bandlimited ramp synthesis — same idea as `Blep` one derivative up.
    Blam,
}

impl Quality {
    fn taps(self) -> usize {
        match self {
            Quality::ZeroOrderHold | Quality::Blep => 1,
            Quality::Linear | Quality::Blam => 2,
            Quality::Cubic => 4,
            Quality::Sinc => 2 * SINC_HALF_WIDTH,
        }
    }

    /// Tap index considered "at or before" the current fractional position.
    fn left_taps(self) -> usize {
        match self {
            Quality::ZeroOrderHold | Quality::Linear | Quality::Blep | Quality::Blam => 0,
            Quality::Cubic => 1,
            Quality::Sinc => SINC_HALF_WIDTH - 1,
        }
    }

    /// Samples of silence pre-fed before real input so the first real
    /// sample can be interpolated/filtered causally.
    pub fn input_delay(self) -> usize {
        self.left_taps()
    }

    /// Samples dropped from the front of produced output — the filter's
    /// warm-up period, expressed in output-sample units.
    pub fn output_delay(self) -> usize {
        match self {
            Quality::ZeroOrderHold | Quality::Linear | Quality::Blep | Quality::Blam => 0,
            Quality::Cubic => 1,
            Quality::Sinc => SINC_HALF_WIDTH,
        }
    }

    /// Minimum number of valid history samples before any output can be
    /// produced at all.
    pub fn min_filled(self) -> usize {
        self.taps()
    }
}

/// A single (src_rate, dst_rate, quality) rate converter.
pub struct Resampler {
    quality: Quality,
    ratio: f64,
    taps: usize,
    left_taps: usize,

    /// Buffered input samples (including pre-fed silence), plus enough
    /// trailing slack to satisfy `taps` around the current position.
    buf: VecDeque<f32>,
    /// Absolute input-sample index of `buf[0]`.
    buf_start: i64,
    /// Absolute input-sample-space position of the next output sample.
    pos: f64,
    /// Output samples still to drop as filter warm-up.
    output_delay_remaining: usize,
    /// Produced output awaiting `pull`.
    ready: Vec<f32>,

    /// BLEP/BLAM leaky integrator state.
    accum: f32,
    /// BLEP/BLAM write-ahead correction ring, width `2*W - 1`.
    write_ahead: VecDeque<f32>,
    prev_held: f32,
    prev_slope: f32,
}

impl Resampler {
    pub fn new(src_rate: f64, dst_rate: f64, quality: Quality) -> Self {
        assert!(src_rate > 0.0 && dst_rate > 0.0);
        let taps = quality.taps();
        let left_taps = quality.left_taps();
        let mut buf = VecDeque::new();
        for _ in 0..quality.input_delay() {
            buf.push_back(0.0);
        }
        let write_ahead_len = 2 * SINC_HALF_WIDTH - 1;
        Self {
            quality,
            ratio: src_rate / dst_rate,
            taps,
            left_taps,
            buf,
            buf_start: 0,
            pos: left_taps as f64,
            output_delay_remaining: quality.output_delay(),
            ready: Vec::new(),
            accum: 0.0,
            write_ahead: std::iter::repeat(0.0).take(write_ahead_len).collect(),
            prev_held: 0.0,
            prev_slope: 0.0,
        }
    }

    /// Feeds newly decoded input samples and generates as much output as
    /// the buffered history now allows.
    pub fn push(&mut self, input: &[f32]) {
        self.buf.extend(input.iter().copied());
        self.generate();
    }

    /// Drains all produced-and-not-yet-pulled output into `out`.
    pub fn pull(&mut self, out: &mut Vec<f32>) {
        out.append(&mut self.ready);
    }

    /// Number of output samples currently buffered and ready for `pull`.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    fn generate(&mut self) {
        match self.quality {
            Quality::ZeroOrderHold | Quality::Linear | Quality::Cubic | Quality::Sinc => {
                self.generate_interpolated()
            }
            Quality::Blep | Quality::Blam => self.generate_blep_blam(),
        }
    }

    fn generate_interpolated(&mut self) {
        loop {
            let floor_pos = self.pos.floor() as i64;
            let lowest = floor_pos - self.left_taps as i64;
            let highest = floor_pos + (self.taps as i64 - self.left_taps as i64 - 1);
            if lowest < self.buf_start || highest >= self.buf_start + self.buf.len() as i64 {
                break;
            }
            let frac = (self.pos - floor_pos as f64) as f32;
            let base = (floor_pos - self.buf_start) as usize;
            let sample = self.interpolate(base, frac);
            self.emit(sample);
            self.pos += self.ratio;
            self.trim_buf();
        }
    }

    fn interpolate(&self, base: usize, frac: f32) -> f32 {
        let at = |offset: i64| -> f32 {
            let idx = base as i64 + offset;
            self.buf[idx as usize]
        };
        match self.quality {
            Quality::ZeroOrderHold => at(0),
            Quality::Linear => {
                let s0 = at(0);
                let s1 = at(1);
                s0 * (1.0 - frac) + s1 * frac
            }
            Quality::Cubic => {
                let lut = tables::cubic_lut();
                let pos = frac * CUBIC_RESOLUTION as f32;
                let idx = (pos as usize).min(lut.len() - 1);
                let w = lut[idx];
                let s_m1 = at(-1);
                let s0 = at(0);
                let s1 = at(1);
                let s2 = at(2);
                w[0] * s_m1 + w[1] * s0 + w[2] * s1 + w[3] * s2
            }
            Quality::Sinc => {
                // Downsampling: scale the kernel by dst/src to lowpass, and
                // renormalise by the kernel sum to preserve DC gain.
                let scale = if self.ratio > 1.0 { 1.0 / self.ratio } else { 1.0 };
                let w = SINC_HALF_WIDTH as i64;
                let mut sum = 0.0f64;
                let mut acc = 0.0f64;
                for k in -(w - 1)..=w {
                    let x = (k as f32 - frac) as f64 * scale;
                    let weight = tables::sinc_at(x) as f64 * scale;
                    sum += weight;
                    acc += weight * at(k) as f64;
                }
                if sum.abs() > 1e-12 {
                    (acc / sum) as f32
                } else {
                    0.0
                }
            }
            Quality::Blep | Quality::Blam => unreachable!(),
        }
    }

    fn emit(&mut self, sample: f32) {
        if self.output_delay_remaining > 0 {
            self.output_delay_remaining -= 1;
        } else {
            self.ready.push(sample);
        }
    }

    fn trim_buf(&mut self) {
        let keep_from = self.pos.floor() as i64 - self.left_taps as i64;
        while self.buf_start < keep_from && !self.buf.is_empty() {
            self.buf.pop_front();
            self.buf_start += 1;
        }
    }

    /// Bandlimited step/ramp synthesis: each admitted input sample's jump
    /// from the previous held value (or slope, for BLAM) is smeared across
    /// a `2*W-1`-wide write-ahead window using the windowed-sinc kernel as
    /// the correction shape, instead of producing a hard discontinuity.
    /// A leaky integrator tracks the resulting "amplitude so far" so the
    /// corrections don't accumulate unbounded DC drift.
    fn generate_blep_blam(&mut self) {
        loop {
            let floor_pos = self.pos.floor() as i64;
            if floor_pos < self.buf_start || floor_pos >= self.buf_start + self.buf.len() as i64 {
                break;
            }
            let idx = (floor_pos - self.buf_start) as usize;
            let input = self.buf[idx];

            match self.quality {
                Quality::Blep => {
                    let step = input - self.prev_held;
                    if step.abs() > 1e-9 {
                        self.smear(step);
                    }
                    self.prev_held = input;
                }
                Quality::Blam => {
                    let slope = input - self.prev_held;
                    let slope_change = slope - self.prev_slope;
                    if slope_change.abs() > 1e-9 {
                        self.smear(slope_change);
                    }
                    self.prev_slope = slope;
                    self.prev_held = input;
                }
                _ => unreachable!(),
            }

            let correction = self.write_ahead.pop_front().unwrap_or(0.0);
            self.write_ahead.push_back(0.0);

            self.accum += self.prev_held + correction;
            self.accum -= self.accum / 8192.0;
            let mut out = self.accum;
            if out.abs() < 1e-20 {
                out = 0.0;
            }
            self.emit(out);

            self.pos += self.ratio;
            self.trim_buf();
        }
    }

    fn smear(&mut self, amount: f32) {
        let w = self.write_ahead.len();
        let center = SINC_HALF_WIDTH - 1;
        for (k, slot) in self.write_ahead.iter_mut().enumerate() {
            let x = k as f64 - center as f64;
            let weight = tables::sinc_at(x) as f32;
            *slot += amount * weight;
        }
        debug_assert_eq!(w, self.write_ahead.len());
    }
}
