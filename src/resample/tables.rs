//! Process-wide resampler lookup tables.
//!
//! The base spec describes these as unsynchronized idempotent first-touch
//! globals ("value-identical on concurrent calls" so no lock is needed).
//! Rust doesn't have a safe way to express "racy but harmless" static
//! initialization, so this uses [`OnceLock`] instead: still idempotent,
//! still built once, but without the data race the original design
//! tolerated. See DESIGN.md for the rationale.

use std::sync::OnceLock;

/// Half-width of the windowed-sinc kernel, in source samples.
pub const SINC_HALF_WIDTH: usize = 16;
/// Phase resolution: number of fractional-position slots per sample.
pub const SINC_RESOLUTION: usize = 1024;
/// Phase resolution for the cubic interpolation table.
pub const CUBIC_RESOLUTION: usize = 1024;

/// One set of 4 Catmull-Rom weights per phase slot.
pub type CubicWeights = [f32; 4];

static CUBIC_LUT: OnceLock<Vec<CubicWeights>> = OnceLock::new();
static SINC_LUT: OnceLock<Vec<f32>> = OnceLock::new();
static WINDOW_LUT: OnceLock<Vec<f32>> = OnceLock::new();

fn build_cubic_lut() -> Vec<CubicWeights> {
    (0..=CUBIC_RESOLUTION)
        .map(|i| {
            let t = i as f32 / CUBIC_RESOLUTION as f32;
            let t2 = t * t;
            let t3 = t2 * t;
            [
                -0.5 * t3 + t2 - 0.5 * t,
                1.5 * t3 - 2.5 * t2 + 1.0,
                -1.5 * t3 + 2.0 * t2 + 0.5 * t,
                0.5 * t3 - 0.5 * t2,
            ]
        })
        .collect()
}

/// `windowLut[i] = 0.40897 + 0.5*cos(pi*y) + 0.09103*cos(2*pi*y)`,
/// `y = i / (W*Resolution)`. A Blackman-family window tapering the sinc
/// kernel to zero at the support edge.
fn build_window_lut() -> Vec<f32> {
    let n = SINC_HALF_WIDTH * SINC_RESOLUTION;
    (0..=n)
        .map(|i| {
            let y = i as f64 / n as f64;
            (0.40897 + 0.5 * (std::f64::consts::PI * y).cos()
                + 0.09103 * (2.0 * std::f64::consts::PI * y).cos()) as f32
        })
        .collect()
}

/// `sinc(x) * window(x)` sampled at `SINC_RESOLUTION` slots per sample,
/// for `x` in `[0, SINC_HALF_WIDTH]`. Negative-side values are obtained by
/// mirroring (sinc and the window are both even functions).
fn build_sinc_lut() -> Vec<f32> {
    let window = window_lut();
    let n = SINC_HALF_WIDTH * SINC_RESOLUTION;
    (0..=n)
        .map(|i| {
            let x = i as f64 / SINC_RESOLUTION as f64;
            let sinc = if x.abs() < 1e-9 {
                1.0
            } else {
                (std::f64::consts::PI * x).sin() / (std::f64::consts::PI * x)
            };
            (sinc as f32) * window[i]
        })
        .collect()
}

pub fn cubic_lut() -> &'static [CubicWeights] {
    CUBIC_LUT.get_or_init(build_cubic_lut)
}

pub fn window_lut() -> &'static [f32] {
    WINDOW_LUT.get_or_init(build_window_lut)
}

pub fn sinc_lut() -> &'static [f32] {
    SINC_LUT.get_or_init(build_sinc_lut)
}

/// Looks up the windowed sinc kernel value at source-sample offset `x`
/// (can be negative; the table only stores `x >= 0` and the function is
/// even). `x` outside `[-W, W]` is zero.
pub fn sinc_at(x: f64) -> f32 {
    let ax = x.abs();
    if ax > SINC_HALF_WIDTH as f64 {
        return 0.0;
    }
    let lut = sinc_lut();
    let pos = ax * SINC_RESOLUTION as f64;
    let idx = pos as usize;
    let frac = (pos - idx as f64) as f32;
    let a = lut[idx.min(lut.len() - 1)];
    let b = lut[(idx + 1).min(lut.len() - 1)];
    a * (1.0 - frac) + b * frac
}
