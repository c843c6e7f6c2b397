//! End-to-end scenarios driving the public `Mixer` API directly, the way a
//! host embedding this crate would.

use mixcore::mixer::{Mixer, MixerOptions, PlayOptions};
use mixcore::testutil::FixedSource;
use mixcore::{ANY_CHANNEL, LOOP_FOREVER};

fn sine_wave(frames: usize, freq_hz: f32, sample_rate: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate).sin())
        .collect()
}

/// Disables the mixer's default 40ms cross-fade, for scenarios asserting
/// exact sample-index behavior that a fade ramp would otherwise smear.
fn no_fade() -> PlayOptions {
    PlayOptions {
        cross_fade_in_secs: 0.0,
        cross_fade_out_secs: 0.0,
        ..Default::default()
    }
}

#[test]
fn silence_when_nothing_has_ever_played() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let out = mixer.loopback_generate(1024);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn one_shot_sound_plays_once_and_then_goes_quiet() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = sine_wave(1000, 440.0, 48000.0);
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    mixer
        .play(
            handle,
            PlayOptions {
                channel: ANY_CHANNEL,
                ..no_fade()
            },
        )
        .unwrap();

    let first_block = mixer.loopback_generate(512);
    assert!(first_block.iter().any(|&s| s.abs() > 0.01));

    // Run well past the source's length; output should settle to silence.
    mixer.loopback_generate(8192);
    let tail = mixer.loopback_generate(512);
    assert!(tail.iter().all(|&s| s == 0.0));
}

#[test]
fn looping_sound_keeps_playing_past_its_own_length() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = sine_wave(256, 440.0, 48000.0);
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    mixer
        .play(
            handle,
            PlayOptions {
                loop_count: LOOP_FOREVER,
                ..no_fade()
            },
        )
        .unwrap();

    // Well beyond one loop's worth of frames, it should still be audible.
    mixer.loopback_generate(4096);
    let out = mixer.loopback_generate(512);
    assert!(out.iter().any(|&s| s.abs() > 0.01));
}

#[test]
fn loop_wrap_inside_a_single_block_keeps_producing_sound() {
    // A 64-frame source looped twice, rendered as one 256-frame block, must
    // stay audible well past the first wrap boundary instead of going
    // silent for the remainder of the callback.
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = vec![1.0f32; 64];
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    mixer
        .play(
            handle,
            PlayOptions {
                loop_count: 2,
                ..no_fade()
            },
        )
        .unwrap();

    let out = mixer.loopback_generate(256);
    for i in 0..200 {
        assert!(out[i * 2].abs() > 0.0, "frame {i} unexpectedly silent after loop wrap");
    }
}

#[test]
fn delayed_playback_starts_silent_then_becomes_audible() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = vec![1.0f32; 2000];
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    mixer
        .play(
            handle,
            PlayOptions {
                delay_before_play_secs: 300.0 / 48000.0,
                ..no_fade()
            },
        )
        .unwrap();

    let out = mixer.loopback_generate(512);
    assert!(out[0] == 0.0 && out[1] == 0.0);
    assert!(out[450 * 2].abs() > 0.0);
}

#[test]
fn start_time_seeks_into_the_source_before_the_first_sample_plays() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let mut data = vec![0.0f32; 2000];
    data[1000..].fill(1.0);
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    mixer
        .play(
            handle,
            PlayOptions {
                start_time_secs: 1500.0 / 48000.0,
                ..no_fade()
            },
        )
        .unwrap();

    let out = mixer.loopback_generate(64);
    assert!(out[0].abs() > 0.0);
}

#[test]
fn conflicting_delay_and_start_time_is_rejected() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = vec![1.0f32; 1000];
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    let err = mixer
        .play(
            handle,
            PlayOptions {
                delay_before_play_secs: 0.01,
                start_time_secs: 0.01,
                ..no_fade()
            },
        )
        .unwrap_err();
    assert_eq!(err, mixcore::MixerError::ConflictingPlayOffsets);
}

#[test]
fn cross_fade_between_two_sounds_on_the_same_channel() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let a = mixer
        .add_source(Box::new(FixedSource::new(vec![1.0f32; 48000], 1, 48000.0)))
        .unwrap();
    let b = mixer
        .add_source(Box::new(FixedSource::new(vec![-1.0f32; 48000], 1, 48000.0)))
        .unwrap();

    let channel = mixer
        .play(
            a,
            PlayOptions {
                channel: 0,
                ..no_fade()
            },
        )
        .unwrap()
        .unwrap();
    mixer.loopback_generate(1024);

    mixer
        .play(
            b,
            PlayOptions {
                channel: channel as i32,
                cross_fade_in_secs: 0.02,
                cross_fade_out_secs: 0.02,
                ..no_fade()
            },
        )
        .unwrap();

    // During the cross-fade both the incoming and outgoing sound
    // contribute; the block should be finite and not a silent gap.
    let during = mixer.loopback_generate(960);
    assert!(during.iter().any(|&s| s != 0.0));
    assert!(during.iter().all(|s| s.is_finite()));
}

#[test]
fn default_play_options_cross_fade_a_busy_channel_by_default() {
    // With default PlayOptions (no explicit fade durations), starting a
    // second sound on a busy channel must cross-fade rather than hard-cut:
    // the first sound should still be contributing immediately after.
    let mut mixer = Mixer::new(MixerOptions::default());
    let a = mixer
        .add_source(Box::new(FixedSource::new(vec![1.0f32; 48000], 1, 48000.0)))
        .unwrap();
    let b = mixer
        .add_source(Box::new(FixedSource::new(vec![1.0f32; 48000], 1, 48000.0)))
        .unwrap();

    let channel = mixer
        .play(a, PlayOptions { channel: 0, ..Default::default() })
        .unwrap()
        .unwrap();
    mixer.loopback_generate(64);
    mixer
        .play(b, PlayOptions { channel: channel as i32, ..Default::default() })
        .unwrap();

    let out = mixer.loopback_generate(8);
    assert!(out.iter().any(|&s| s.abs() > 0.0));
}

#[test]
fn any_channel_drops_the_command_instead_of_stealing_a_busy_channel() {
    let mut mixer = Mixer::new(MixerOptions {
        num_channels: 1,
        ..Default::default()
    });
    let a = mixer
        .add_source(Box::new(FixedSource::new(vec![1.0f32; 48000], 1, 48000.0)))
        .unwrap();
    let b = mixer
        .add_source(Box::new(FixedSource::new(vec![-1.0f32; 48000], 1, 48000.0)))
        .unwrap();

    let landed = mixer.play(a, PlayOptions { channel: 0, ..no_fade() }).unwrap();
    assert_eq!(landed, Some(0));

    let dropped = mixer
        .play(b, PlayOptions { channel: ANY_CHANNEL, ..no_fade() })
        .unwrap();
    assert_eq!(dropped, None);

    let out = mixer.loopback_generate(64);
    assert!(out.iter().all(|&s| s >= -1e-6));
}

#[test]
fn master_volume_mutes_and_restores_without_clicking_to_full_instantly() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = vec![0.8f32; 48000];
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 1, 48000.0)))
        .unwrap();
    mixer.play(handle, no_fade()).unwrap();

    mixer.set_master_volume(0.0);
    mixer.loopback_generate(20_000);
    let silent = mixer.loopback_generate(256);
    assert!(silent.iter().all(|&s| s.abs() < 1e-6));

    mixer.set_master_volume(1.0);
    mixer.loopback_generate(4096);
    let restored = mixer.loopback_generate(256);
    assert!(restored.iter().any(|&s| s.abs() > 0.1));
}

#[test]
fn stereo_source_is_not_collapsed_to_mono() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let mut data = Vec::new();
    for _ in 0..4096 {
        data.push(1.0);
        data.push(-1.0);
    }
    let handle = mixer
        .add_source(Box::new(FixedSource::new(data, 2, 48000.0)))
        .unwrap();
    mixer
        .play(
            handle,
            PlayOptions {
                pan: 0.0,
                ..no_fade()
            },
        )
        .unwrap();
    let out = mixer.loopback_generate(512);
    let left_energy: f32 = out.iter().step_by(2).map(|s| s * s).sum();
    let right_energy: f32 = out.iter().skip(1).step_by(2).map(|s| s * s).sum();
    assert!(left_energy > 0.0 && right_energy > 0.0);
}

#[test]
fn non_realtime_safe_source_routes_through_buffered_stream_and_still_plays() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let data = vec![0.5f32; 20_000];
    let handle = mixer
        .add_source(Box::new(
            FixedSource::new(data, 1, 48000.0).with_realtime_safe(false),
        ))
        .unwrap();
    mixer.play(handle, no_fade()).unwrap();

    let out = mixer.loopback_generate(2048);
    assert!(out.iter().any(|&s| s.abs() > 0.1));
}

#[test]
fn unloading_a_playing_source_silences_it_instead_of_panicking() {
    let mut mixer = Mixer::new(MixerOptions::default());
    let handle = mixer
        .add_source(Box::new(FixedSource::new(vec![1.0f32; 48000], 1, 48000.0)))
        .unwrap();
    mixer.play(handle, no_fade()).unwrap();
    mixer.unload(handle);
    let out = mixer.loopback_generate(512);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn playback_clock_reflects_total_frames_generated_regardless_of_activity() {
    let mut mixer = Mixer::new(MixerOptions {
        sample_rate: 44100,
        ..Default::default()
    });
    mixer.loopback_generate(4410);
    assert!((mixer.playback_time_in_seconds() - 0.1).abs() < 1e-6);
}

#[test]
fn latency_compensation_shifts_the_reported_playback_clock() {
    let mut mixer = Mixer::new(MixerOptions {
        sample_rate: 44100,
        ..Default::default()
    });
    mixer.set_latency_compensation_frames(441);
    mixer.loopback_generate(4410);
    assert!((mixer.playback_time_in_seconds() - (4410 - 441) as f64 / 44100.0).abs() < 1e-9);
}
