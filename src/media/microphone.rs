//! Microphone capture using CPAL (Cross-Platform Audio Library).

use crate::audio::resample;
use crate::defaults;
use crate::error::{FluentFlowError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run a closure with stderr routed to /dev/null.
///
/// CPAL probes every backend on startup and ALSA/JACK print errors for the
/// ones that are absent. Redirecting fd 2 around the probe keeps the
/// terminal clean for the transcript.
///
/// # Safety
/// Saves and restores fd 2 with `libc::dup`/`libc::dup2`; nothing else may
/// touch stderr from another thread while the closure runs.
pub fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Quiet the audio backends before any device is opened.
///
/// Sets the JACK/PipeWire/ALSA environment knobs that stop their startup
/// chatter from interleaving with the call output.
///
/// # Safety
/// Mutates the process environment; must run at startup before any thread
/// is spawned.
pub fn suppress_audio_warnings() {
    // SAFETY: called once from the entry point, pre-threads
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Sound servers worth picking over raw hardware when no device is
/// configured; they route through whatever microphone the desktop selected.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Name fragments of endpoints that are never sensible microphones:
/// multichannel splits and digital outputs.
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List usable audio input devices for the `devices` command.
///
/// Sound servers get a "\[recommended\]" tag; endpoints that cannot be a
/// microphone are dropped from the list entirely.
///
/// # Errors
/// Returns `FluentFlowError::AudioCapture` if device enumeration fails.
pub fn list_input_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| FluentFlowError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Pick the input device for a call when none is configured: a sound server
/// if one is present, otherwise the host default.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| FluentFlowError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only created and dropped by the owning
/// `Microphone`; no stream method is called across threads.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture delivering 16kHz mono f32 buffers over a channel.
///
/// Tries the preferred format first (f32/16kHz/mono), then falls back to the
/// device's default config with software conversion (channel mixing + resampling).
pub struct Microphone {
    device: cpal::Device,
    stream: Option<SendableStream>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
}

impl Microphone {
    /// Open the named input device, or the best default if `device_name` is None.
    ///
    /// # Errors
    /// Returns `AudioDeviceNotFound` if no matching device exists.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host
                    .input_devices()
                    .map_err(|e| FluentFlowError::AudioCapture {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;

                let mut found_device = None;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        found_device = Some(dev);
                        break;
                    }
                }

                found_device.ok_or_else(|| FluentFlowError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate: defaults::INPUT_SAMPLE_RATE,
        })
    }

    /// Start capturing. Returns the receiving end of the sample channel.
    ///
    /// Idempotent while running: a second call returns an error because the
    /// original receiver is still the only consumer.
    pub fn start(&mut self) -> Result<Receiver<Vec<f32>>> {
        if self.stream.is_some() {
            return Err(FluentFlowError::AudioCapture {
                message: "capture already started".to_string(),
            });
        }

        let (tx, rx) = unbounded();

        let stream = self.build_stream(tx.clone())?;
        stream.play().map_err(|e| FluentFlowError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        // Wait briefly to check if the CPAL callback actually fires.
        // Some PipeWire-ALSA setups accept non-native configs but never deliver data.
        std::thread::sleep(std::time::Duration::from_millis(200));

        let final_stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
            drop(stream);
            let native_stream = self.build_stream_native(tx)?;
            native_stream
                .play()
                .map_err(|e| FluentFlowError::AudioCapture {
                    message: format!("Failed to start native audio stream: {}", e),
                })?;
            native_stream
        } else {
            stream
        };

        self.stream = Some(SendableStream(final_stream));
        Ok(rx)
    }

    /// Stop capturing. Safe to call when not started.
    pub fn stop(&mut self) {
        if let Some(sendable_stream) = self.stream.take()
            && let Err(e) = sendable_stream.0.pause()
        {
            log::warn!("failed to pause input stream: {}", e);
        }
    }

    /// True while the capture stream is live.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Build the audio stream with the preferred format (f32/16kHz/mono).
    fn build_stream(&self, tx: Sender<Vec<f32>>) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let counter = Arc::clone(&self.callback_count);
        self.device
            .build_input_stream(
                &preferred_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    let _ = tx.send(data.to_vec());
                },
                |err| {
                    log::error!("audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| FluentFlowError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }

    /// Build a stream using the device's default/native config, with software
    /// channel mixing (stereo→mono) and resampling (native rate→16kHz).
    fn build_stream_native(&self, tx: Sender<Vec<f32>>) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| FluentFlowError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        log::info!(
            "using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        let counter = Arc::clone(&self.callback_count);

        match default_config.sample_format() {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let converted =
                            convert_to_mono_f32(data, native_channels, native_rate, target_rate);
                        let _ = tx.send(converted);
                    },
                    |err| {
                        log::error!("audio input stream error: {}", err);
                    },
                    None,
                )
                .map_err(|e| FluentFlowError::AudioCapture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 32768.0).collect();
                        let converted = convert_to_mono_f32(
                            &float_data,
                            native_channels,
                            native_rate,
                            target_rate,
                        );
                        let _ = tx.send(converted);
                    },
                    |err| {
                        log::error!("audio input stream error: {}", err);
                    },
                    None,
                )
                .map_err(|e| FluentFlowError::AudioCapture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            fmt => Err(FluentFlowError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try specifying a device with --device.",
                    fmt
                ),
            }),
        }
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono_f32(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let mono: Vec<f32> = if channels == 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    resample::linear(&mono, source_rate, target_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_hides_non_microphone_endpoints() {
        for name in [
            "surround40:CARD=PCH,DEV=0",
            "front:CARD=PCH",
            "HDMI 2",
            "iec958 S/PDIF Output",
        ] {
            assert!(should_filter_device(name), "{name} should be hidden");
        }
        for name in ["pipewire", "default", "Built-in Audio Analog Stereo"] {
            assert!(!should_filter_device(name), "{name} should be listed");
        }
    }

    #[test]
    fn test_sound_servers_are_preferred_over_raw_hardware() {
        for name in ["PipeWire", "pulse", "PulseAudio Sound Server"] {
            assert!(is_preferred_device(name), "{name} should be preferred");
        }
        for name in ["hw:CARD=PCH,DEV=0", "default"] {
            assert!(!is_preferred_device(name), "{name} should not be preferred");
        }
    }

    #[test]
    fn test_convert_stereo_to_mono_averages_channels() {
        let stereo = vec![0.2, 0.4, -0.6, -0.2];
        let mono = convert_to_mono_f32(&stereo, 2, 16000, 16000);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] + 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_convert_mono_passthrough() {
        let samples = vec![0.1, -0.1, 0.5];
        assert_eq!(convert_to_mono_f32(&samples, 1, 16000, 16000), samples);
    }

    #[test]
    fn test_create_with_invalid_device_name() {
        let mic = Microphone::new(Some("NonExistentDevice12345"));
        match mic {
            Err(FluentFlowError::AudioDeviceNotFound { device }) => {
                assert_eq!(device, "NonExistentDevice12345");
            }
            Err(FluentFlowError::AudioCapture { .. }) => {
                // Hosts without any audio backend fail at enumeration instead
            }
            Ok(_) => panic!("expected device lookup to fail"),
            Err(other) => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_list_devices_returns_at_least_one_device() {
        let devices = list_input_devices();
        assert!(devices.is_ok());
        assert!(!devices.unwrap().is_empty());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_start_stop_lifecycle() {
        let mut mic = Microphone::new(None).expect("Failed to open microphone");
        assert!(!mic.is_running());

        let rx = mic.start().expect("Failed to start capture");
        assert!(mic.is_running());

        std::thread::sleep(std::time::Duration::from_millis(300));
        // Some buffers should have arrived
        assert!(rx.try_recv().is_ok());

        mic.stop();
        assert!(!mic.is_running());

        // Stop again is a no-op
        mic.stop();
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_double_start_is_rejected() {
        let mut mic = Microphone::new(None).expect("Failed to open microphone");
        let _rx = mic.start().expect("Failed to start capture");
        assert!(mic.start().is_err());
    }
}
