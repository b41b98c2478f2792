//! Outbound media pipeline: frames microphone audio and times camera
//! snapshots.
//!
//! Both halves are pure state machines so the mute gate, frame boundaries,
//! and snapshot cadence are testable without devices.

use crate::defaults;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Abstraction over time sources for testing.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Accumulates capture buffers into fixed-size frames, dropping everything
/// while muted.
///
/// Capture buffer sizes are device-dependent; the wire wants exact
/// 4096-sample frames. Remainders carry over to the next frame. Muted
/// buffers are discarded outright, never buffered, so unmuting cannot leak
/// audio recorded while muted.
pub struct AudioFramer {
    frame_samples: usize,
    pending: Vec<f32>,
    muted: Arc<AtomicBool>,
}

impl AudioFramer {
    pub fn new(muted: Arc<AtomicBool>) -> Self {
        Self::with_frame_samples(defaults::AUDIO_FRAME_SAMPLES, muted)
    }

    pub fn with_frame_samples(frame_samples: usize, muted: Arc<AtomicBool>) -> Self {
        Self {
            frame_samples,
            pending: Vec::new(),
            muted,
        }
    }

    /// Feed a capture buffer; returns zero or more complete frames.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        if self.muted.load(Ordering::SeqCst) {
            // Also drop any partial frame recorded before the mute so no
            // pre-mute tail is sent after unmuting mid-frame.
            self.pending.clear();
            return Vec::new();
        }

        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            frames.push(std::mem::replace(&mut self.pending, rest));
        }
        frames
    }

    /// Samples waiting for the next frame boundary.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

/// Decides when the next camera snapshot is due.
///
/// The first snapshot fires one interval after the ticker starts, matching
/// a repeating timer. While the video flag is off the tick is a no-op and
/// the schedule keeps sliding, so re-enabling video never bursts.
pub struct SnapshotTicker<C: Clock = SystemClock> {
    interval: Duration,
    last: Option<Instant>,
    video_enabled: Arc<AtomicBool>,
    clock: C,
}

impl SnapshotTicker<SystemClock> {
    pub fn new(video_enabled: Arc<AtomicBool>) -> Self {
        Self::with_clock(
            Duration::from_millis(defaults::SNAPSHOT_INTERVAL_MS),
            video_enabled,
            SystemClock,
        )
    }
}

impl<C: Clock> SnapshotTicker<C> {
    pub fn with_clock(interval: Duration, video_enabled: Arc<AtomicBool>, clock: C) -> Self {
        Self {
            interval,
            last: None,
            video_enabled,
            clock,
        }
    }

    /// True when a snapshot should be taken now.
    pub fn due(&mut self) -> bool {
        let now = self.clock.now();
        let last = *self.last.get_or_insert(now);

        if now.duration_since(last) < self.interval {
            return false;
        }
        self.last = Some(now);

        self.video_enabled.load(Ordering::SeqCst)
    }
}
