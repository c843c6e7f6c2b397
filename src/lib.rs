//! Embeddable real-time audio mixer for games.
//!
//! A [`Mixer`](mixer::Mixer) owns a fixed pool of [`Channel`](channel::Channel)s
//! and an arena of loaded [`AudioSource`](source::AudioSource)s. Hosts feed it
//! decoders through the [`DecodeStream`](decode::DecodeStream) trait and drive
//! it either through a real [`Sink`](sink::Sink) or by pulling rendered
//! frames straight out with [`Mixer::loopback_generate`](mixer::Mixer::loopback_generate).

pub mod buffered_stream;
pub mod channel;
pub mod chunked_vec;
pub mod decode;
pub mod decoded_stream;
pub mod effects;
pub mod error;
pub mod mixer;
pub mod resample;
pub mod sink;
pub mod source;

#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use channel::{SourceHandle, ANY_CHANNEL, LOOP_FOREVER};
pub use decode::DecodeStream;
pub use error::MixerError;
pub use mixer::{Mixer, MixerOptions, PlayOptions};
pub use sink::Sink;
