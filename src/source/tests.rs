use super::*;

struct FiniteTone {
    value: f32,
    channels: u16,
    sample_rate: f32,
    frames_remaining: usize,
}

impl DecodeStream for FiniteTone {
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
fn full_decode_leaves_source_finished_and_length_known() {
    let stream = Box::new(FiniteTone {
        value: 0.3,
        channels: 2,
        sample_rate: 48000.0,
        frames_remaining: 500,
    });
    let mut src = AudioSource::prepare_to_play(stream, 48000.0);
    assert!(src.length_in_frames().is_none());
    src.full_decode();
    assert!(src.length_in_frames().is_some());
    assert!(src.length_in_seconds().unwrap() > 0.0);
}

#[test]
fn disallow_full_decode_makes_full_decode_a_no_op() {
    let stream = Box::new(FiniteTone {
        value: 0.3,
        channels: 1,
        sample_rate: 48000.0,
        frames_remaining: 500,
    });
    let mut src = AudioSource::prepare_to_play(stream, 48000.0);
    src.disallow_full_decode();
    src.full_decode();
    assert!(src.length_in_frames().is_none());
}

#[test]
fn mix_into_buffer_reports_original_length_at_decoder_rate() {
    let stream = Box::new(FiniteTone {
        value: 0.1,
        channels: 1,
        sample_rate: 22050.0,
        frames_remaining: 777,
    });
    let src = AudioSource::prepare_to_play(stream, 48000.0);
    assert_eq!(src.original_length_in_frames(), Some(777));
}
