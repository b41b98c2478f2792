//! Gapless scheduling of inbound model speech.
//!
//! The scheduler mirrors how a web audio clock schedules buffers: each chunk
//! starts at `max(cursor, playhead)` and advances the cursor by its duration,
//! so chunks arriving faster than real time queue back-to-back with no gaps.

use crate::error::Result;

/// Destination for scheduled samples.
///
/// This trait allows swapping implementations (real output device vs mock).
pub trait PlaybackSink: Send {
    /// Queue samples for playback after everything already queued.
    fn enqueue(&mut self, samples: &[f32]) -> Result<()>;

    /// Drop all queued but not yet played samples.
    fn flush(&mut self);

    /// Seconds of audio actually played so far (the playhead).
    fn position(&self) -> f64;
}

/// Schedules decoded audio chunks onto a [`PlaybackSink`] without gaps.
pub struct PlaybackScheduler<S: PlaybackSink> {
    sink: S,
    sample_rate: u32,
    /// End time (seconds) of the last scheduled chunk.
    cursor: f64,
}

impl<S: PlaybackSink> PlaybackScheduler<S> {
    pub fn new(sink: S, sample_rate: u32) -> Self {
        Self {
            sink,
            sample_rate,
            cursor: 0.0,
        }
    }

    /// Schedule a chunk of samples to play immediately after the previous
    /// chunk, or now if playback has caught up.
    pub fn schedule(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let start = self.cursor.max(self.sink.position());
        let duration = samples.len() as f64 / self.sample_rate as f64;

        self.sink.enqueue(samples)?;
        self.cursor = start + duration;
        Ok(())
    }

    /// Stop everything queued and reset the schedule.
    ///
    /// After an interruption nothing previously scheduled is ever audible,
    /// and the cursor returns to 0 so the next chunk plays immediately.
    pub fn interrupt(&mut self) {
        self.sink.flush();
        self.cursor = 0.0;
    }

    /// End time (seconds) of the last scheduled chunk.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// True while scheduled audio extends past the playhead.
    pub fn is_playing(&self) -> bool {
        self.cursor > self.sink.position()
    }
}
