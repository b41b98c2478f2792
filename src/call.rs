//! Call lifecycle and orchestration.
//!
//! A call wires local media into the realtime session and the session's
//! events into playback and the transcript:
//!
//! ```text
//! microphone ──▶ framer (mute gate) ──▶ encode ──▶ ┐
//! camera ──▶ ticker (video gate) ──▶ jpeg ───────▶ ├─▶ live session
//!                                                  ┘       │
//!            playback scheduler ◀── decode ◀── audio ◀─────┤
//!            transcript ◀── transcription fragments ◀──────┘
//! ```

use crate::audio::codec;
use crate::audio::output::CpalPlayback;
use crate::audio::playback::{PlaybackScheduler, PlaybackSink};
use crate::defaults;
use crate::error::{FluentFlowError, Result};
use crate::level::ProficiencyLevel;
use crate::media::MediaStreams;
use crate::outbound::{AudioFramer, SnapshotTicker};
use crate::session::{LiveSession, SessionEvent};
use crate::transcript::{Speaker, Transcript, TranscriptUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Call lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Connecting,
    Connected,
    Closed,
}

/// Lifecycle state plus an orthogonal error slot: recording an error keeps
/// the lifecycle state, so "Connected with an error" and "Closed cleanly"
/// are both representable.
#[derive(Debug, Clone)]
pub struct CallStatus {
    state: CallState,
    error: Option<String>,
}

impl CallStatus {
    pub fn new() -> Self {
        Self {
            state: CallState::Idle,
            error: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Idle → Connecting.
    pub fn begin_connecting(&mut self) -> Result<()> {
        match self.state {
            CallState::Idle => {
                self.state = CallState::Connecting;
                Ok(())
            }
            other => Err(FluentFlowError::Other(format!(
                "cannot start a call from the {:?} state",
                other
            ))),
        }
    }

    /// Connecting → Connected.
    pub fn mark_connected(&mut self) -> Result<()> {
        match self.state {
            CallState::Connecting => {
                self.state = CallState::Connected;
                Ok(())
            }
            other => Err(FluentFlowError::Other(format!(
                "cannot connect from the {:?} state",
                other
            ))),
        }
    }

    /// Any state → Closed. Idempotent.
    pub fn mark_closed(&mut self) {
        self.state = CallState::Closed;
    }

    /// Record an error without changing the lifecycle state.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

impl Default for CallStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything needed to place a call.
#[derive(Debug, Clone)]
pub struct CallSettings {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub level: ProficiencyLevel,
    pub audio_input_device: Option<String>,
    pub audio_output_device: Option<String>,
    /// None for an audio-only call.
    pub camera_index: Option<u32>,
}

/// Apply one session event to playback and the transcript.
///
/// Returns the transcript change for rendering, or an error when the
/// session ended. Soft failures never surface here; they are dropped
/// upstream.
fn dispatch_event<S: PlaybackSink>(
    event: SessionEvent,
    scheduler: &mut PlaybackScheduler<S>,
    transcript: &mut Transcript,
) -> Result<TranscriptUpdate> {
    match event {
        SessionEvent::Audio(samples) => {
            scheduler.schedule(&samples)?;
            Ok(TranscriptUpdate::None)
        }
        SessionEvent::Interrupted => {
            scheduler.interrupt();
            Ok(TranscriptUpdate::None)
        }
        SessionEvent::UserTranscription(text) => {
            Ok(transcript.push_fragment(Speaker::User, &text))
        }
        SessionEvent::ModelTranscription(text) => {
            Ok(transcript.push_fragment(Speaker::Model, &text))
        }
        SessionEvent::TurnComplete => Ok(transcript.finalize_turn()),
        SessionEvent::Closed { reason } => Err(FluentFlowError::SessionClosed { message: reason }),
    }
}

/// Runtime toggles for a call in progress.
///
/// Cloneable and detached from the call itself, so the UI can flip mute and
/// camera while the event loop holds the call mutably.
#[derive(Clone)]
pub struct CallControls {
    muted: Arc<AtomicBool>,
    video_enabled: Arc<AtomicBool>,
}

impl CallControls {
    /// Flip the mute flag; returns the new state.
    pub fn toggle_muted(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::SeqCst)
    }

    /// Flip the camera-snapshot flag; returns the new state.
    pub fn toggle_video(&self) -> bool {
        !self.video_enabled.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::SeqCst)
    }
}

/// A call in progress.
pub struct ActiveCall {
    status: Arc<Mutex<CallStatus>>,
    running: Arc<AtomicBool>,
    media: MediaStreams,
    session: Option<LiveSession>,
    event_rx: Option<UnboundedReceiver<SessionEvent>>,
    scheduler: PlaybackScheduler<CpalPlayback>,
    transcript: Transcript,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ActiveCall {
    /// Place a call: open media, connect the session, start the outbound
    /// workers.
    ///
    /// # Errors
    /// Device and connection failures are fatal; nothing is retried and all
    /// partially-acquired resources are released.
    pub async fn start(settings: CallSettings) -> Result<Self> {
        let status = Arc::new(Mutex::new(CallStatus::new()));
        lock_status(&status).begin_connecting()?;

        let mut media =
            MediaStreams::open(settings.audio_input_device.as_deref(), settings.camera_index)
                .inspect_err(|e| record_failure(&status, e))?;

        let playback = CpalPlayback::new(settings.audio_output_device.as_deref())
            .inspect_err(|e| record_failure(&status, e))?;
        let scheduler = PlaybackScheduler::new(playback, defaults::OUTPUT_SAMPLE_RATE);

        let system_instruction = settings.level.system_instruction();
        let (session, event_rx) = match LiveSession::connect(
            &settings.api_key,
            &settings.model,
            &settings.voice,
            &system_instruction,
        )
        .await
        {
            Ok(connected) => connected,
            Err(e) => {
                record_failure(&status, &e);
                media.release();
                return Err(e);
            }
        };

        lock_status(&status).mark_connected()?;
        let running = Arc::new(AtomicBool::new(true));
        let mut workers = Vec::new();

        // Microphone worker: capture buffers → mute-gated frames → PCM blobs.
        // start_audio blocks while probing stream configs, so it runs off
        // the runtime thread.
        let (mut media, mic_rx) = tokio::task::spawn_blocking(move || {
            let mut media = media;
            let rx = media.start_audio()?;
            Ok::<_, FluentFlowError>((media, rx))
        })
        .await
        .map_err(|e| FluentFlowError::Other(format!("capture startup task failed: {}", e)))??;
        let sender = session.sender();
        let mic_running = Arc::clone(&running);
        let mut framer = AudioFramer::new(media.mute_flag());
        workers.push(thread::spawn(move || {
            while mic_running.load(Ordering::SeqCst) {
                let buffer = match mic_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(buffer) => buffer,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                };
                for frame in framer.push(&buffer) {
                    if sender.send_audio(codec::encode_pcm(&frame)).is_err() {
                        return;
                    }
                }
            }
        }));

        // Snapshot worker: camera frames on the ticker, gated by the video flag
        if let Some(mut camera) = media.take_camera() {
            let sender = session.sender();
            let snapshot_running = Arc::clone(&running);
            let mut ticker = SnapshotTicker::new(media.video_flag());
            workers.push(thread::spawn(move || {
                while snapshot_running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                    if !ticker.due() {
                        continue;
                    }
                    match camera.snapshot() {
                        Ok(encoded) => {
                            if sender.send_image(encoded).is_err() {
                                return;
                            }
                        }
                        // Transient grab failures skip one tick
                        Err(e) => log::warn!("{}", e),
                    }
                }
            }));
        }

        Ok(Self {
            status,
            running,
            media,
            session: Some(session),
            event_rx: Some(event_rx),
            scheduler,
            transcript: Transcript::new(),
            workers,
        })
    }

    /// Drive the inbound event loop until the session ends or `hang_up`
    /// stops the call. Each transcript change is passed to `on_update`.
    ///
    /// # Errors
    /// Returns `SessionClosed` when the server ends the session. The call is
    /// hung up before returning; the error is not retryable.
    pub async fn run(&mut self, mut on_update: impl FnMut(&TranscriptUpdate)) -> Result<()> {
        let Some(mut event_rx) = self.event_rx.take() else {
            return Err(FluentFlowError::Other(
                "call event loop already consumed".to_string(),
            ));
        };

        while let Some(event) = event_rx.recv().await {
            match dispatch_event(event, &mut self.scheduler, &mut self.transcript) {
                Ok(TranscriptUpdate::None) => {}
                Ok(update) => on_update(&update),
                Err(e) => {
                    lock_status(&self.status).record_error(e.to_string());
                    self.hang_up().await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Toggle handle for the in-call controls (mute, camera).
    pub fn controls(&self) -> CallControls {
        CallControls {
            muted: self.media.mute_flag(),
            video_enabled: self.media.video_flag(),
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.media.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.media.is_muted()
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.media.set_video_enabled(enabled);
    }

    pub fn is_video_enabled(&self) -> bool {
        self.media.is_video_enabled()
    }

    pub fn status(&self) -> CallStatus {
        lock_status(&self.status).clone()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// End the call: stop workers, release devices, flush playback, close
    /// the socket. Safe to call any number of times, from any state.
    pub async fn hang_up(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            for worker in self.workers.drain(..) {
                if worker.join().is_err() {
                    log::warn!("call worker panicked during shutdown");
                }
            }
        }

        self.media.release();
        self.scheduler.interrupt();

        if let Some(session) = self.session.take() {
            session.close().await;
        }

        lock_status(&self.status).mark_closed();
    }
}

fn lock_status(status: &Arc<Mutex<CallStatus>>) -> std::sync::MutexGuard<'_, CallStatus> {
    // Recover from a poisoned lock; status is plain data
    match status.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn record_failure(status: &Arc<Mutex<CallStatus>>, error: &FluentFlowError) {
    let mut status = lock_status(status);
    status.record_error(error.to_string());
    status.mark_closed();
}
