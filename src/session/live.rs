//! WebSocket session with the realtime model.
//!
//! `LiveSession::connect` opens the socket, performs the setup handshake,
//! and splits the connection into an outbound writer task (fed by the
//! senders below) and an inbound reader task that turns wire frames into
//! [`SessionEvent`]s.

use crate::audio::codec;
use crate::defaults;
use crate::error::{FluentFlowError, Result};
use crate::session::wire::{
    Blob, RealtimeInputMessage, SetupMessage, looks_like_json, parse_server_message,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Time allowed for the server to acknowledge the setup message.
const SETUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the server streams back, decoded and ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Decoded 24kHz model speech samples.
    Audio(Vec<f32>),
    /// Live transcription of the user's microphone.
    UserTranscription(String),
    /// Live transcription of the model's speech.
    ModelTranscription(String),
    /// The current turn is complete.
    TurnComplete,
    /// The user interrupted the model; drop all queued playback.
    Interrupted,
    /// The socket closed (server hangup or transport error). Fatal.
    Closed { reason: String },
}

/// Handle to an open realtime session.
pub struct LiveSession {
    outbound_tx: UnboundedSender<Message>,
    tasks: Vec<JoinHandle<()>>,
}

/// Cloneable sending half for the capture workers.
#[derive(Clone)]
pub struct RealtimeSender {
    outbound_tx: UnboundedSender<Message>,
}

impl RealtimeSender {
    /// Send one base64 PCM audio frame.
    pub fn send_audio(&self, encoded_pcm: String) -> Result<()> {
        self.send_blob(Blob::audio(encoded_pcm))
    }

    /// Send one base64 JPEG snapshot.
    pub fn send_image(&self, encoded_jpeg: String) -> Result<()> {
        self.send_blob(Blob::image(encoded_jpeg))
    }

    fn send_blob(&self, blob: Blob) -> Result<()> {
        let message = RealtimeInputMessage::new(blob);
        let json = serde_json::to_string(&message).map_err(|e| FluentFlowError::Session {
            message: format!("failed to serialize realtime input: {}", e),
        })?;
        self.outbound_tx
            .send(Message::Text(json))
            .map_err(|_| FluentFlowError::SessionClosed {
                message: "session is no longer open".to_string(),
            })
    }
}

impl LiveSession {
    /// Connect, send the setup message, and wait for `setupComplete`.
    ///
    /// Returns the session handle and the inbound event stream.
    ///
    /// # Errors
    /// Returns `Session` for transport or handshake failures. No retry is
    /// attempted; a failed session ends the call.
    pub async fn connect(
        api_key: &str,
        model: &str,
        voice: &str,
        system_instruction: &str,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>)> {
        let url = format!("{}?key={}", defaults::LIVE_WS_URL, api_key);

        let (ws, _) = connect_async(&url)
            .await
            .map_err(|e| FluentFlowError::Session {
                message: format!("connection failed: {}", e),
            })?;
        let (mut write, mut read) = ws.split();

        let setup = SetupMessage::new(model, voice, system_instruction);
        let setup_json =
            serde_json::to_string(&setup).map_err(|e| FluentFlowError::Session {
                message: format!("failed to serialize setup: {}", e),
            })?;
        write
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| FluentFlowError::Session {
                message: format!("failed to send setup: {}", e),
            })?;

        wait_for_setup_complete(&mut read).await?;
        log::info!("live session established with {}", model);

        // Outbound: serialize sends through one writer task
        let (outbound_tx, mut outbound_rx) = unbounded_channel::<Message>();
        let writer_task = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    log::debug!("outbound send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Inbound: decode frames into session events
        let (event_tx, event_rx) = unbounded_channel::<SessionEvent>();
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(payload)) => {
                        dispatch_payload(&payload, &event_tx);
                    }
                    Ok(Message::Binary(payload)) if looks_like_json(&payload) => {
                        match String::from_utf8(payload) {
                            Ok(payload) => dispatch_payload(&payload, &event_tx),
                            Err(e) => log::warn!("dropping non-UTF-8 frame: {}", e),
                        }
                    }
                    Ok(Message::Close(close_frame)) => {
                        let reason = close_frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "server closed the session".to_string());
                        let _ = event_tx.send(SessionEvent::Closed { reason });
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(SessionEvent::Closed {
                            reason: format!("transport error: {}", e),
                        });
                        return;
                    }
                }
            }
            let _ = event_tx.send(SessionEvent::Closed {
                reason: "connection ended".to_string(),
            });
        });

        Ok((
            Self {
                outbound_tx,
                tasks: vec![writer_task, reader_task],
            },
            event_rx,
        ))
    }

    /// Sending half for the microphone and snapshot workers.
    pub fn sender(&self) -> RealtimeSender {
        RealtimeSender {
            outbound_tx: self.outbound_tx.clone(),
        }
    }

    /// Close the socket and wait briefly for the worker tasks to finish.
    pub async fn close(mut self) {
        let _ = self.outbound_tx.send(Message::Close(None));
        for task in self.tasks.drain(..) {
            if tokio::time::timeout(Duration::from_secs(1), task)
                .await
                .is_err()
            {
                log::debug!("session task did not finish before shutdown deadline");
            }
        }
    }
}

/// Read frames until the server acknowledges the setup.
async fn wait_for_setup_complete<S>(read: &mut S) -> Result<()>
where
    S: StreamExt<
            Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>,
        > + Unpin,
{
    let handshake = async {
        while let Some(frame) = read.next().await {
            let payload = match frame {
                Ok(Message::Text(payload)) => payload,
                Ok(Message::Binary(payload)) if looks_like_json(&payload) => {
                    String::from_utf8(payload).unwrap_or_default()
                }
                Ok(Message::Close(_)) => {
                    return Err(FluentFlowError::SessionClosed {
                        message: "server closed during handshake".to_string(),
                    });
                }
                Ok(_) => continue,
                Err(e) => {
                    return Err(FluentFlowError::Session {
                        message: format!("handshake transport error: {}", e),
                    });
                }
            };

            if let Ok(message) = parse_server_message(&payload)
                && message.setup_complete.is_some()
            {
                return Ok(());
            }
        }
        Err(FluentFlowError::Session {
            message: "connection ended before setup completed".to_string(),
        })
    };

    tokio::time::timeout(SETUP_TIMEOUT, handshake)
        .await
        .map_err(|_| FluentFlowError::Session {
            message: "timed out waiting for setup acknowledgement".to_string(),
        })?
}

fn dispatch_payload(payload: &str, event_tx: &UnboundedSender<SessionEvent>) {
    match parse_server_message(payload) {
        Ok(message) => {
            for event in events_from_message(message) {
                let _ = event_tx.send(event);
            }
        }
        // Unparseable frames are soft failures: drop and continue
        Err(e) => log::warn!("{}", e),
    }
}

/// Expand one parsed server message into session events.
///
/// Audio chunks that fail to decode are dropped individually; the rest of
/// the message still goes through. Audio carried in an interrupted frame
/// belongs to the cancelled utterance and is never emitted.
fn events_from_message(message: crate::session::wire::ServerMessage) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let Some(content) = message.server_content else {
        return events;
    };

    if content.interrupted {
        events.push(SessionEvent::Interrupted);
    }

    if !content.interrupted && let Some(model_turn) = content.model_turn {
        for part in model_turn.parts {
            if let Some(blob) = part.inline_data {
                match codec::decode_pcm(&blob.data) {
                    Ok(samples) => events.push(SessionEvent::Audio(samples)),
                    Err(e) => log::warn!("dropping audio chunk: {}", e),
                }
            }
        }
    }

    if let Some(transcription) = content.input_transcription
        && !transcription.text.is_empty()
    {
        events.push(SessionEvent::UserTranscription(transcription.text));
    }

    if let Some(transcription) = content.output_transcription
        && !transcription.text.is_empty()
    {
        events.push(SessionEvent::ModelTranscription(transcription.text));
    }

    if content.turn_complete {
        events.push(SessionEvent::TurnComplete);
    }

    events
}
