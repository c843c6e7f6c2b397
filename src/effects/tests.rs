use super::*;

#[test]
fn parameter_clamps_both_directions() {
    let mut p = Parameter::new(0.5, 0.0, 1.0);
    p.set(5.0);
    assert_eq!(p.get(), 1.0);
    p.set(-5.0);
    assert_eq!(p.get(), 0.0);
}

#[test]
fn gain_converges_to_target_over_time() {
    let mut g = EffectGain::new(1.0);
    g.prepare_to_play(48000.0);
    g.set_parameter("Gain", 0.0);
    let mut buf = vec![1.0f32; 2 * 4096];
    g.process_audio(&mut buf, 4096);
    // After many smoothing steps, output should have decayed close to zero.
    assert!(buf[2 * 4000].abs() < 0.01);
}

#[test]
fn gain_does_not_click_instantly_to_new_target() {
    let mut g = EffectGain::new(1.0);
    g.prepare_to_play(48000.0);
    g.set_parameter("Gain", 0.0);
    let mut buf = vec![1.0f32; 2];
    g.process_audio(&mut buf, 1);
    // First sample after the change should not have jumped all the way.
    assert!(buf[0] > 0.5);
}

#[test]
fn process_in_chunks_splits_at_max_frames_boundary() {
    struct CountCalls(Vec<usize>);
    impl IAudioEffect for CountCalls {
        fn prepare_to_play(&mut self, _sample_rate: f32) {}
        fn process_audio(&mut self, _buffer: &mut [f32], frames: usize) {
            self.0.push(frames);
        }
    }
    let mut effect = CountCalls(Vec::new());
    let total_frames = MAX_FRAMES_FOR_EFFECTS * 2 + 10;
    let mut buf = vec![0.0f32; total_frames * 2];
    process_in_chunks(&mut effect, &mut buf, total_frames);
    assert_eq!(effect.0, vec![MAX_FRAMES_FOR_EFFECTS, MAX_FRAMES_FOR_EFFECTS, 10]);
}

#[test]
fn callback_effect_forwards_state_and_sample_rate() {
    let eff = EffectCallback::new(0.0f32, |state: &mut f32, buf: &mut [f32], frames: usize| {
        for i in 0..frames {
            buf[i * 2] += *state;
            buf[i * 2 + 1] += *state;
        }
    })
    .with_prepare(|state: &mut f32, sample_rate: f32| {
        *state = sample_rate;
    });
    let mut eff = eff;
    eff.prepare_to_play(48000.0);
    let mut buf = vec![0.0f32; 4];
    eff.process_audio(&mut buf, 2);
    assert_eq!(buf, vec![48000.0, 48000.0, 48000.0, 48000.0]);
}
