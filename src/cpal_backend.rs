//! Reference [`Sink`] built on `cpal` for hosts that don't want to write
//! their own device backend.
//!
//! Unlike a push-model backend that pre-renders into a ring buffer from a
//! separate producer thread, this sink is pull-based: cpal's own callback
//! *is* the real-time thread, and it calls the mixer's `write` closure
//! directly to fill each buffer. No extra ring buffer or thread needed —
//! [`crate::buffered_stream::BufferedStream`] already isolates the mixer
//! from anything that can't keep up in real time.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::error;

use crate::error::MixerError;
use crate::sink::Sink;

pub struct CpalSink {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    stream: Option<cpal::Stream>,
}

impl CpalSink {
    /// Opens the system's default output device.
    pub fn default_device() -> Result<Self, MixerError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(MixerError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| MixerError::DeviceOpenFailed(e.to_string()))?;
        Ok(Self {
            device,
            config,
            stream: None,
        })
    }
}

impl Sink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    fn start(&mut self, mut write: Box<dyn FnMut(&mut [f32]) + Send>) -> Result<(), MixerError> {
        let channels = self.config.channels() as usize;
        if channels != 2 {
            return Err(MixerError::ChannelLayoutUnsupported);
        }

        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => {
                let stream_config = self.config.clone().into();
                self.device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            write(data);
                        },
                        |err| error!("cpal output stream error: {err}"),
                        None,
                    )
                    .map_err(|e| MixerError::DeviceOpenFailed(e.to_string()))?
            }
            cpal::SampleFormat::I16 => {
                let stream_config = self.config.clone().into();
                let mut scratch: Vec<f32> = Vec::new();
                self.device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            scratch.clear();
                            scratch.resize(data.len(), 0.0);
                            write(&mut scratch);
                            for (dst, src) in data.iter_mut().zip(scratch.iter()) {
                                *dst = (src * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                            }
                        },
                        |err| error!("cpal output stream error: {err}"),
                        None,
                    )
                    .map_err(|e| MixerError::DeviceOpenFailed(e.to_string()))?
            }
            _ => return Err(MixerError::FormatUnsupported),
        };

        stream
            .play()
            .map_err(|e| MixerError::StreamUnrecoverable(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }
}
