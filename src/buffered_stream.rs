//! Producer-thread ring buffer sitting between a non-realtime-safe decode
//! stream and the mixer's real-time consumer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::debug;

use crate::decode::DecodeStream;

/// ~100ms worth of frames per producer iteration, matching the base spec's
/// `decodeIncrement`.
fn decode_increment_frames(sample_rate: f32) -> usize {
    (sample_rate * 0.1).round().max(1.0) as usize
}

/// If `stream.realtime_safe()` is true, returns it unchanged — no thread,
/// no ring buffer, no overhead. Otherwise spawns a producer thread and
/// returns a [`BufferedStream`] presenting the same [`DecodeStream`]
/// interface, back-pressured against a bounded ring.
pub fn wrap(stream: Box<dyn DecodeStream>) -> Box<dyn DecodeStream> {
    if stream.realtime_safe() {
        stream
    } else {
        Box::new(BufferedStream::new(stream))
    }
}

struct Shared {
    state: Mutex<RingState>,
    not_full: Condvar,
    not_empty: Condvar,
    should_die: AtomicBool,
}

struct RingState {
    ring: VecDeque<f32>,
    capacity_samples: usize,
    finished: bool,
}

/// Wraps a non-realtime-safe [`DecodeStream`] with a dedicated producer
/// thread and a bounded interleaved-sample ring buffer, so the consumer
/// (the mixer's decode-ahead machinery) never blocks on file I/O.
pub struct BufferedStream {
    shared: std::sync::Arc<Shared>,
    channels: u16,
    sample_rate: f32,
    length_in_frames: Option<i64>,
    producer: Option<JoinHandle<()>>,
}

impl BufferedStream {
    pub fn new(mut stream: Box<dyn DecodeStream>) -> Self {
        let channels = stream.num_channels();
        let sample_rate = stream.sample_rate();
        let length_in_frames = stream.length_in_frames();

        // Capacity ~= 1 second of audio.
        let capacity_samples = (sample_rate.max(1.0) as usize) * channels as usize;

        let shared = std::sync::Arc::new(Shared {
            state: Mutex::new(RingState {
                ring: VecDeque::with_capacity(capacity_samples),
                capacity_samples,
                finished: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            should_die: AtomicBool::new(false),
        });

        let producer_shared = shared.clone();
        let decode_increment = decode_increment_frames(sample_rate) * channels as usize;

        let producer = std::thread::Builder::new()
            .name("mixcore-decode".into())
            .spawn(move || {
                debug!("decode producer thread started");
                let mut scratch = vec![0.0f32; decode_increment];
                loop {
                    if producer_shared.should_die.load(Ordering::Acquire) {
                        break;
                    }

                    let request_samples = {
                        let mut state = producer_shared.state.lock().unwrap();
                        loop {
                            if producer_shared.should_die.load(Ordering::Acquire)
                                || state.finished
                            {
                                return;
                            }
                            let room = state.capacity_samples.saturating_sub(state.ring.len());
                            if room == 0 {
                                state = producer_shared.not_full.wait(state).unwrap();
                                continue;
                            }
                            break room.min(decode_increment);
                        }
                    };

                    if request_samples == 0 {
                        continue;
                    }
                    let request_frames = request_samples / channels.max(1) as usize;
                    if request_frames == 0 {
                        continue;
                    }

                    // No mutex held during decode/I/O.
                    let frames_read =
                        stream.read_samples_float(&mut scratch[..request_frames * channels as usize], request_frames);

                    let finished_now = frames_read < request_frames;

                    if frames_read > 0 {
                        let mut state = producer_shared.state.lock().unwrap();
                        state
                            .ring
                            .extend(scratch[..frames_read * channels as usize].iter().copied());
                        if finished_now {
                            state.finished = true;
                        }
                        drop(state);
                        producer_shared.not_empty.notify_one();
                    } else if finished_now {
                        let mut state = producer_shared.state.lock().unwrap();
                        state.finished = true;
                        drop(state);
                        producer_shared.not_empty.notify_one();
                    }

                    if finished_now {
                        debug!("decode producer thread finished (stream exhausted)");
                        break;
                    }
                }
            })
            .expect("failed to spawn decode producer thread");

        Self {
            shared,
            channels,
            sample_rate,
            length_in_frames,
            producer: Some(producer),
        }
    }
}

impl DecodeStream for BufferedStream {
    fn num_channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn length_in_frames(&self) -> Option<i64> {
        self.length_in_frames
    }

    fn realtime_safe(&self) -> bool {
        // The whole point of this wrapper is to make a non-realtime-safe
        // stream safe to call from the audio thread.
        true
    }

    fn read_samples_float(&mut self, out: &mut [f32], frames: usize) -> usize {
        let channels = self.channels.max(1) as usize;
        let mut filled_frames = 0usize;

        while filled_frames < frames {
            let mut state = self.shared.state.lock().unwrap();
            loop {
                if !state.ring.is_empty() {
                    break;
                }
                if state.finished {
                    return filled_frames;
                }
                state = self.shared.not_empty.wait(state).unwrap();
            }

            let want_frames = frames - filled_frames;
            let available_frames = state.ring.len() / channels;
            let take_frames = want_frames.min(available_frames);
            let take_samples = take_frames * channels;

            let dst_start = filled_frames * channels;
            for i in 0..take_samples {
                out[dst_start + i] = state.ring.pop_front().unwrap();
            }
            filled_frames += take_frames;

            drop(state);
            self.shared.not_full.notify_one();

            if take_frames == 0 {
                // Ring had leftover samples not forming a whole frame
                // (shouldn't happen since we always push whole frames),
                // avoid spinning.
                break;
            }
        }

        filled_frames
    }
}

impl Drop for BufferedStream {
    fn drop(&mut self) {
        self.shared.should_die.store(true, Ordering::Release);
        self.shared.not_full.notify_all();
        self.shared.not_empty.notify_all();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStream {
        data: Vec<f32>,
        pos: usize,
        channels: u16,
        sample_rate: f32,
        realtime_safe: bool,
    }

    impl DecodeStream for FixedStream {
        fn num_channels(&self) -> u16 {
            self.channels
        }
        fn sample_rate(&self) -> f32 {
            self.sample_rate
        }
        fn length_in_frames(&self) -> Option<i64> {
            Some((self.data.len() / self.channels as usize) as i64)
        }
        fn realtime_safe(&self) -> bool {
            self.realtime_safe
        }
        fn read_samples_float(&mut self, out: &mut [f32], frames: usize) -> usize {
            let channels = self.channels as usize;
            let remaining_frames = (self.data.len() - self.pos) / channels;
            let n = frames.min(remaining_frames);
            out[..n * channels].copy_from_slice(&self.data[self.pos..self.pos + n * channels]);
            self.pos += n * channels;
            n
        }
    }

    #[test]
    fn realtime_safe_stream_is_passed_through_unwrapped() {
        let stream = Box::new(FixedStream {
            data: vec![1.0, 2.0],
            pos: 0,
            channels: 1,
            sample_rate: 48000.0,
            realtime_safe: true,
        });
        // wrap() should not spawn a thread for an already realtime-safe
        // stream; we can't directly observe "no thread" from outside, but
        // we can check it still round-trips reads correctly.
        let mut s = wrap(stream);
        let mut out = vec![0.0f32; 2];
        assert_eq!(s.read_samples_float(&mut out, 2), 2);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn non_realtime_safe_stream_reads_all_samples_via_producer_thread() {
        let data: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let stream = Box::new(FixedStream {
            data: data.clone(),
            pos: 0,
            channels: 1,
            sample_rate: 48000.0,
            realtime_safe: false,
        });
        let mut s = wrap(stream);

        let mut collected = Vec::new();
        loop {
            let mut buf = vec![0.0f32; 64];
            let n = s.read_samples_float(&mut buf, 64);
            collected.extend_from_slice(&buf[..n]);
            if n < 64 {
                break;
            }
        }
        assert_eq!(collected, data);
    }

    #[test]
    fn drop_joins_producer_thread_without_hanging() {
        let data: Vec<f32> = vec![0.0; 200_000];
        let stream = Box::new(FixedStream {
            data,
            pos: 0,
            channels: 2,
            sample_rate: 48000.0,
            realtime_safe: false,
        });
        let s = wrap(stream);
        // Drop immediately without reading — should still join cleanly.
        drop(s);
    }
}
