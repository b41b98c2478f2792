//! Audio: wire codec, playback scheduling, and the CPAL output sink.

pub mod codec;
pub mod output;
pub mod playback;
pub mod resample;

pub use codec::{decode_pcm, encode_pcm};
pub use output::CpalPlayback;
pub use playback::{PlaybackScheduler, PlaybackSink};
