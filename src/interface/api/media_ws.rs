//! Carrier media-stream bridge
//!
//! The carrier opens one WebSocket per call leg that asked for hold audio.
//! A `start` control message carries the stream SID; from then on every
//! relay chunk goes out as a base64 media frame tagged with that SID, in
//! arrival order. `stop`, socket closure, or source EOF tears the session
//! down, transcoder child included.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::router::AppState;
use crate::infrastructure::media::MediaRelay;

/// Frames buffered towards the socket writer before the forwarder waits.
const OUTBOUND_CAPACITY: usize = 32;

/// Control messages the carrier sends on the media socket. Everything not
/// listed here ("connected", "mark", inbound media) is noise we ignore.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum ControlMessage {
    Start { start: StartPayload },
    Stop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StartPayload {
    #[serde(rename = "streamSid")]
    stream_sid: String,
}

#[derive(Debug, Serialize)]
struct MediaFrame<'a> {
    event: &'static str,
    #[serde(rename = "streamSid")]
    stream_sid: &'a str,
    media: MediaPayload,
}

#[derive(Debug, Serialize)]
struct MediaPayload {
    payload: String,
}

fn media_frame(stream_sid: &str, chunk: &[u8]) -> serde_json::Result<String> {
    serde_json::to_string(&MediaFrame {
        event: "media",
        stream_sid,
        media: MediaPayload {
            payload: BASE64.encode(chunk),
        },
    })
}

pub async fn media_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(socket: WebSocket, state: AppState) {
    info!("carrier media socket connected");
    let (sender, mut receiver) = socket.split();

    let (out_tx, out_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
    let send_task = tokio::spawn(write_frames(sender, out_rx));
    let mut session: Option<MediaSession> = None;

    while let Some(Ok(message)) = receiver.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        match serde_json::from_str::<ControlMessage>(&text) {
            Ok(ControlMessage::Start { start }) => {
                // A second start replaces the session outright.
                if let Some(old) = session.take() {
                    old.teardown();
                }
                info!(stream_sid = %start.stream_sid, "media stream started");
                match MediaRelay::new().open(&state.config.stream_url) {
                    Ok(relay) => {
                        session = Some(MediaSession::spawn(
                            start.stream_sid,
                            relay,
                            out_tx.clone(),
                        ));
                    }
                    Err(e) => error!(error = %e, "could not open media relay"),
                }
            }
            Ok(ControlMessage::Stop) => {
                if let Some(old) = session.take() {
                    info!(stream_sid = %old.stream_sid, "media stream stopped");
                    old.teardown();
                }
            }
            Ok(ControlMessage::Other) => {}
            Err(_) => debug!("ignoring unparseable control message"),
        }
    }

    if let Some(old) = session.take() {
        old.teardown();
    }
    send_task.abort();
    info!("carrier media socket closed");
}

async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Message>,
) {
    while let Some(frame) = frames.recv().await {
        if sender.send(frame).await.is_err() {
            debug!("media socket send failed, client gone");
            break;
        }
    }
}

/// One live media session: the relay plus the task pumping its chunks out.
struct MediaSession {
    stream_sid: String,
    forward: JoinHandle<()>,
}

impl MediaSession {
    fn spawn(
        stream_sid: String,
        mut relay: crate::infrastructure::media::RelayHandle,
        out: mpsc::Sender<Message>,
    ) -> Self {
        let sid = stream_sid.clone();
        let forward = tokio::spawn(async move {
            forward_chunks(&sid, relay.chunks(), out).await;
            // Source ran dry on its own: reap the transcoder.
            relay.stop().await;
        });
        Self {
            stream_sid,
            forward,
        }
    }

    /// Abort the forwarder. Dropping its owned relay handle kills the
    /// transcoder child.
    fn teardown(self) {
        self.forward.abort();
    }
}

async fn forward_chunks(
    stream_sid: &str,
    chunks: &mut mpsc::Receiver<Bytes>,
    out: mpsc::Sender<Message>,
) {
    while let Some(chunk) = chunks.recv().await {
        match media_frame(stream_sid, &chunk) {
            Ok(frame) => {
                if out.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            Err(e) => error!(error = %e, "failed to encode media frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_frame_is_tagged_and_base64_encoded() {
        let frame = media_frame("MZ123", &[0x00, 0x7f, 0xff]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["event"], "media");
        assert_eq!(parsed["streamSid"], "MZ123");
        let payload = parsed["media"]["payload"].as_str().unwrap();
        assert_eq!(BASE64.decode(payload).unwrap(), vec![0x00, 0x7f, 0xff]);
    }

    #[test]
    fn control_messages_parse() {
        let start: ControlMessage =
            serde_json::from_str(r#"{"event":"start","start":{"streamSid":"MZ1"}}"#).unwrap();
        assert!(matches!(
            start,
            ControlMessage::Start { ref start } if start.stream_sid == "MZ1"
        ));

        let stop: ControlMessage = serde_json::from_str(r#"{"event":"stop"}"#).unwrap();
        assert!(matches!(stop, ControlMessage::Stop));

        let other: ControlMessage = serde_json::from_str(r#"{"event":"connected"}"#).unwrap();
        assert!(matches!(other, ControlMessage::Other));

        assert!(serde_json::from_str::<ControlMessage>("{ nope").is_err());
    }

    #[tokio::test]
    async fn chunks_forward_in_order_with_the_session_sid() {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<Bytes>(8);
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(8);

        let chunks: Vec<Bytes> = (0u8..5)
            .map(|i| Bytes::from(vec![i; 4]))
            .collect();
        for chunk in &chunks {
            chunk_tx.send(chunk.clone()).await.unwrap();
        }
        drop(chunk_tx);

        forward_chunks("MZ7", &mut chunk_rx, out_tx).await;

        let mut frames = Vec::new();
        while let Some(Message::Text(frame)) = out_rx.recv().await {
            frames.push(frame);
        }
        assert_eq!(frames.len(), chunks.len());
        for (frame, chunk) in frames.iter().zip(&chunks) {
            let parsed: serde_json::Value = serde_json::from_str(frame).unwrap();
            assert_eq!(parsed["streamSid"], "MZ7");
            let payload = parsed["media"]["payload"].as_str().unwrap();
            assert_eq!(BASE64.decode(payload).unwrap(), chunk.to_vec());
        }
    }

    #[tokio::test]
    async fn forwarding_stops_when_the_socket_side_closes() {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<Bytes>(8);
        let (out_tx, out_rx) = mpsc::channel::<Message>(8);
        drop(out_rx);

        chunk_tx.send(Bytes::from_static(b"data")).await.unwrap();
        // Must return rather than spin once the outbound side is gone.
        forward_chunks("MZ8", &mut chunk_rx, out_tx).await;
    }
}
