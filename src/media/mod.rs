//! Local media: microphone capture, camera snapshots, and the shared
//! mute/video toggles.

pub mod camera;
pub mod microphone;

pub use camera::CameraSnapshotter;
pub use microphone::{Microphone, list_input_devices, suppress_audio_warnings};

use crate::error::Result;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The user's local media for one call: a microphone and optionally a camera,
/// plus the toggles the call controls observe.
///
/// Mute does not stop capture — the outbound pipeline drops muted buffers so
/// nothing is buffered or sent late. The video flag gates the snapshot tick
/// the same way.
pub struct MediaStreams {
    microphone: Microphone,
    camera: Option<CameraSnapshotter>,
    muted: Arc<AtomicBool>,
    video_enabled: Arc<AtomicBool>,
    released: bool,
}

impl MediaStreams {
    /// Open the microphone (and camera, if a device index is given).
    ///
    /// Device failures here are fatal: a call cannot start without media.
    pub fn open(audio_device: Option<&str>, camera_index: Option<u32>) -> Result<Self> {
        let microphone = Microphone::new(audio_device)?;
        let camera = match camera_index {
            Some(index) => Some(CameraSnapshotter::new(index)?),
            None => None,
        };
        let video_enabled = camera.is_some();

        Ok(Self {
            microphone,
            camera,
            muted: Arc::new(AtomicBool::new(false)),
            video_enabled: Arc::new(AtomicBool::new(video_enabled)),
            released: false,
        })
    }

    /// Start microphone capture and return the sample channel.
    pub fn start_audio(&mut self) -> Result<Receiver<Vec<f32>>> {
        self.microphone.start()
    }

    /// Hand the camera to the snapshot worker. Returns None for audio-only
    /// calls or if already taken.
    pub fn take_camera(&mut self) -> Option<CameraSnapshotter> {
        self.camera.take()
    }

    /// Shared mute flag, observed by the outbound audio framer.
    pub fn mute_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.muted)
    }

    /// Shared video flag, observed by the snapshot ticker.
    pub fn video_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.video_enabled)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.video_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::SeqCst)
    }

    /// Stop all capture and close devices. Idempotent: a second call is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.microphone.stop();
        if let Some(mut camera) = self.camera.take() {
            camera.close();
        }
        self.video_enabled.store(false, Ordering::SeqCst);
    }

    /// True once `release` has run.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for MediaStreams {
    fn drop(&mut self) {
        self.release();
    }
}
