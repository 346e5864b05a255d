//! WebSocket progress channel.
//!
//! One channel per job: the backend pushes `{type: "progress", …}` frames
//! while the job runs. The channel is strictly best-effort — any transport
//! failure just closes it, and the job monitor keeps polling.

use crate::error::{ClientError, Result};
use crate::types::ProgressFrame;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tungstenite::Message;
use tracing::{debug, warn};

/// Handle to a live progress subscription.
///
/// Dropping the handle aborts the underlying read task, so a torn-down
/// view can never receive another frame.
pub struct ProgressChannel {
    rx: mpsc::Receiver<ProgressFrame>,
    task: Option<JoinHandle<()>>,
}

impl ProgressChannel {
    /// Connect to the given `ws://`/`wss://` URL and start forwarding
    /// frames.
    pub(crate) async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        debug!("Progress channel open: {url}");

        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(async move {
            let (_write, mut read) = stream.split();
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ProgressFrame>(&text) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => debug!("Ignoring unrecognized progress frame: {err}"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("Progress channel transport error: {err}");
                        break;
                    }
                }
            }
            // Sender drops here; the receiver observes closure and the
            // monitor falls back to polling alone.
        });

        Ok(Self {
            rx,
            task: Some(task),
        })
    }

    /// Build a channel from a pre-fed receiver. Used by scripted backends
    /// in tests.
    pub fn scripted(rx: mpsc::Receiver<ProgressFrame>) -> Self {
        Self { rx, task: None }
    }

    /// Receive the next frame; `None` once the channel is closed or lost.
    pub async fn recv(&mut self) -> Option<ProgressFrame> {
        self.rx.recv().await
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_channel_delivers_then_closes() {
        let (tx, rx) = mpsc::channel(4);
        let mut channel = ProgressChannel::scripted(rx);

        tx.send(ProgressFrame::Progress {
            progress: 10.0,
            message: None,
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(
            channel.recv().await,
            Some(ProgressFrame::Progress {
                progress: 10.0,
                message: None,
            })
        );
        assert_eq!(channel.recv().await, None);
    }
}
