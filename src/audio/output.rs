//! Real audio playback using CPAL.
//!
//! Implements [`PlaybackSink`] on top of an output stream: enqueued samples
//! go into a shared queue the device callback drains, and the playhead is
//! the count of frames the callback has actually consumed.

use crate::audio::playback::PlaybackSink;
use crate::audio::resample;
use crate::defaults;
use crate::error::{FluentFlowError, Result};
use crate::media::microphone::with_suppressed_stderr;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is created once, never shared, and only dropped.
/// All interaction after creation goes through the Arc'd queue and counter.
struct SendableStream(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for SendableStream {}

/// Playback sink backed by a CPAL output stream.
///
/// Accepts 24kHz mono f32 samples (the model's output format) and converts
/// to the device's native rate and channel count on enqueue.
pub struct CpalPlayback {
    _stream: SendableStream,
    queue: Arc<Mutex<VecDeque<f32>>>,
    consumed_frames: Arc<AtomicU64>,
    device_rate: u32,
    source_rate: u32,
}

impl CpalPlayback {
    /// Open the default (or named) output device.
    ///
    /// # Errors
    /// Returns `AudioDeviceNotFound` if no output device matches, or
    /// `AudioPlayback` if the stream cannot be built or started.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let mut devices = host.output_devices().map_err(|e| {
                    FluentFlowError::AudioPlayback {
                        message: format!("Failed to enumerate output devices: {}", e),
                    }
                })?;
                devices
                    .find(|d| d.name().is_ok_and(|n| n == name))
                    .ok_or_else(|| FluentFlowError::AudioDeviceNotFound {
                        device: name.to_string(),
                    })
            } else {
                host.default_output_device()
                    .ok_or_else(|| FluentFlowError::AudioDeviceNotFound {
                        device: "default output".to_string(),
                    })
            }
        })?;

        let default_config =
            device
                .default_output_config()
                .map_err(|e| FluentFlowError::AudioPlayback {
                    message: format!("Failed to query default output config: {}", e),
                })?;

        let device_rate = default_config.sample_rate().0;
        let channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.into();

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let consumed_frames = Arc::new(AtomicU64::new(0));

        let cb_queue = Arc::clone(&queue);
        let cb_consumed = Arc::clone(&consumed_frames);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = match cb_queue.lock() {
                        Ok(q) => q,
                        Err(_) => {
                            data.fill(0.0);
                            return;
                        }
                    };
                    let mut frames_written = 0u64;
                    for frame in data.chunks_mut(channels) {
                        match queue.pop_front() {
                            Some(sample) => {
                                frame.fill(sample);
                                frames_written += 1;
                            }
                            None => frame.fill(0.0),
                        }
                    }
                    cb_consumed.fetch_add(frames_written, Ordering::Relaxed);
                },
                |err| {
                    log::error!("audio output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| FluentFlowError::AudioPlayback {
                message: format!("Failed to build output stream: {}", e),
            })?;

        stream.play().map_err(|e| FluentFlowError::AudioPlayback {
            message: format!("Failed to start output stream: {}", e),
        })?;

        Ok(Self {
            _stream: SendableStream(stream),
            queue,
            consumed_frames,
            device_rate,
            source_rate: defaults::OUTPUT_SAMPLE_RATE,
        })
    }
}

impl PlaybackSink for CpalPlayback {
    fn enqueue(&mut self, samples: &[f32]) -> Result<()> {
        let converted = resample::linear(samples, self.source_rate, self.device_rate);
        let mut queue = self.queue.lock().map_err(|e| FluentFlowError::AudioPlayback {
            message: format!("Failed to lock playback queue: {}", e),
        })?;
        queue.extend(converted);
        Ok(())
    }

    fn flush(&mut self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
    }

    fn position(&self) -> f64 {
        self.consumed_frames.load(Ordering::Relaxed) as f64 / self.device_rate as f64
    }
}
