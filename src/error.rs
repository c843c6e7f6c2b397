//! Mixer error types

use core::fmt;

/// Errors the mixer can encounter, per the construction/propagation policy
/// in the design doc: construction errors latch the mixer into an errored
/// state, per-block decode errors are silent, and sink `Underflow` is
/// transient (not represented here — it never reaches the caller).
#[derive(Debug, Clone, PartialEq)]
pub enum MixerError {
    /// The sink could not be opened (device busy, config rejected, etc).
    DeviceOpenFailed(String),
    /// No output device is available on this host.
    NoOutputDevice,
    /// The sink only supports a sample format the mixer can't produce.
    FormatUnsupported,
    /// The sink's channel layout isn't stereo.
    ChannelLayoutUnsupported,
    /// The sink failed in a way that can't be recovered from mid-stream.
    StreamUnrecoverable(String),
    /// A buffer or resource allocation failed.
    AllocationFailed,
    /// A source failed to load (decoder reported an error at open time).
    SourceLoadFailed(String),
    /// A decode stream reported a channel count other than 1 or 2.
    InvalidChannelCount(u16),
    /// `channel` in `PlayOptions` was out of `[0, numChannels)`.
    InvalidChannelIndex(i32),
    /// Both `delayBeforePlay` and `startTimeSecs` were non-zero.
    ConflictingPlayOffsets,
    /// `full_decode` was called after `prepare_to_play` latched the source.
    FullDecodeAfterPrepare,
}

impl fmt::Display for MixerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerError::DeviceOpenFailed(e) => write!(f, "failed to open audio device: {e}"),
            MixerError::NoOutputDevice => write!(f, "no audio output device available"),
            MixerError::FormatUnsupported => {
                write!(f, "sink does not support a usable sample format")
            }
            MixerError::ChannelLayoutUnsupported => {
                write!(f, "sink channel layout is not stereo")
            }
            MixerError::StreamUnrecoverable(e) => write!(f, "audio stream failed: {e}"),
            MixerError::AllocationFailed => write!(f, "allocation failed"),
            MixerError::SourceLoadFailed(e) => write!(f, "failed to load source: {e}"),
            MixerError::InvalidChannelCount(n) => {
                write!(f, "source has {n} channels, expected 1 or 2")
            }
            MixerError::InvalidChannelIndex(c) => write!(f, "invalid mixer channel index {c}"),
            MixerError::ConflictingPlayOffsets => write!(
                f,
                "delayBeforePlay and startTimeSecs are mutually exclusive"
            ),
            MixerError::FullDecodeAfterPrepare => {
                write!(f, "full_decode() called after prepare_to_play()")
            }
        }
    }
}

impl std::error::Error for MixerError {}
