//! Live-source transcode relay
//!
//! Each open media session gets its own transcoder child pulling the
//! configured live source and emitting 8 kHz mono mu-law on stdout. The
//! child is owned by the [`RelayHandle`]; dropping or stopping the handle
//! kills it, so a torn-down session cannot leak a process.

use bytes::Bytes;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Read size from the transcoder: 3200 bytes is 400 ms of 8 kHz mu-law.
const READ_BUF_SIZE: usize = 3200;

/// Chunks buffered between the reader and a slow socket before the reader
/// backpressures.
const CHANNEL_CAPACITY: usize = 32;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to spawn transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder has no stdout handle")]
    NoStdout,
}

/// Factory for transcode relays. The binary is parameterizable so tests
/// can substitute a stub.
#[derive(Debug, Clone)]
pub struct MediaRelay {
    binary: String,
}

impl Default for MediaRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaRelay {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Transcoder argv: live source in, telephony-narrowband mu-law out.
    fn transcode_args(source_url: &str) -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            source_url,
            "-acodec",
            "pcm_mulaw",
            "-f",
            "mulaw",
            "-ar",
            "8000",
            "-ac",
            "1",
            "pipe:1",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Spawn a transcoder for `source_url` and start forwarding its output.
    ///
    /// The returned handle yields chunks in production order. Source errors
    /// and EOF close the chunk channel; there is no auto-reconnect, the
    /// session simply runs dry.
    pub fn open(&self, source_url: &str) -> Result<RelayHandle, RelayError> {
        let mut child = Command::new(&self.binary)
            .args(Self::transcode_args(source_url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(RelayError::Spawn)?;

        let mut stdout = child.stdout.take().ok_or(RelayError::NoStdout)?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let source = source_url.to_string();

        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUF_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => {
                        info!(source = %source, "relay source ended");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                            // Receiver gone: the session closed first.
                            break;
                        }
                    }
                    Err(e) => {
                        error!(source = %source, error = %e, "relay read failed");
                        break;
                    }
                }
            }
        });

        Ok(RelayHandle { child, reader, rx })
    }
}

/// A running transcode pipeline, owned exclusively by one media session.
pub struct RelayHandle {
    child: Child,
    reader: tokio::task::JoinHandle<()>,
    rx: mpsc::Receiver<Bytes>,
}

impl RelayHandle {
    /// Next transcoded chunk; `None` once the source has ended or errored.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// The chunk stream, for callers that forward it elsewhere.
    pub fn chunks(&mut self) -> &mut mpsc::Receiver<Bytes> {
        &mut self.rx
    }

    /// Terminate the transcoder and its reader.
    pub async fn stop(mut self) {
        self.reader.abort();
        if let Err(e) = self.child.kill().await {
            // Already exited on its own.
            debug!(error = %e, "transcoder was not running");
        }
    }
}
