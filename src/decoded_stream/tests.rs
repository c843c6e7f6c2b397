use super::*;

struct ToneStream {
    value: f32,
    channels: u16,
    sample_rate: f32,
    frames_remaining: usize,
}

impl DecodeStream for ToneStream {
    fn num_channels(&self) -> u16 {
        self.channels
    }
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
    fn length_in_frames(&self) -> Option<i64> {
        Some(self.frames_remaining as i64)
    }
    fn realtime_safe(&self) -> bool {
        true
    }
    fn read_samples_float(&mut self, out: &mut [f32], frames: usize) -> usize {
        let n = frames.min(self.frames_remaining);
        for f in 0..n {
            for c in 0..self.channels as usize {
                out[f * self.channels as usize + c] = self.value;
            }
        }
        self.frames_remaining -= n;
        n
    }
}

#[test]
fn decodes_constant_value_preserving_dc_at_matching_rate() {
    let stream = Box::new(ToneStream {
        value: 0.5,
        channels: 1,
        sample_rate: 48000.0,
        frames_remaining: 4000,
    });
    let mut ds = DecodedStream::new(stream, 48000.0);
    let mut dst = vec![vec![0.0f32; 512]];
    let ramp = vec![1.0f32; 512];
    let got = ds.mix_into_buffer(&mut dst, 0, 512, &ramp, 1.0);
    assert_eq!(got, 512);
    for &s in &dst[0][8..500] {
        assert!((s - 0.5).abs() < 1e-2, "got {s}");
    }
}

#[test]
fn reports_finished_after_stream_exhausted_and_tail_flushed() {
    let stream = Box::new(ToneStream {
        value: 1.0,
        channels: 1,
        sample_rate: 48000.0,
        frames_remaining: 100,
    });
    let mut ds = DecodedStream::new(stream, 48000.0);
    let mut dst = vec![vec![0.0f32; 4096]];
    let ramp = vec![1.0f32; 4096];
    let got = ds.mix_into_buffer(&mut dst, 0, 4096, &ramp, 1.0);
    assert!(got < 4096);
    assert!(ds.is_finished_at(got));
}

#[test]
fn mono_source_duplicates_into_both_output_channels() {
    let stream = Box::new(ToneStream {
        value: 0.25,
        channels: 1,
        sample_rate: 48000.0,
        frames_remaining: 1000,
    });
    let mut ds = DecodedStream::new(stream, 48000.0);
    let mut dst = vec![vec![0.0f32; 256], vec![0.0f32; 256]];
    let ramp = vec![1.0f32; 256];
    ds.mix_into_buffer(&mut dst, 0, 256, &ramp, 1.0);
    for c in 0..2 {
        for &s in &dst[c][8..240] {
            assert!((s - 0.25).abs() < 1e-2);
        }
    }
}
