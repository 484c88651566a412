//! Real-time wait channel
//!
//! After a sign request is initiated, the backend exposes a websocket that
//! streams status messages while the user scans and approves the QR code.
//! [`WaitChannel`] owns that connection and drives a small state machine:
//!
//! ```text
//! AwaitingScan --(scan event)--> Verifying --(backend lookup)--> outcome
//! ```
//!
//! A channel resolves exactly once. `run` consumes the channel, so a second
//! resolution is unrepresentable, and the underlying connection is closed
//! exactly once on every path, including timeout.

use crate::{parse_event, LifecycleEvent, Result, SignError, SignRequest, SigningBackend};
use crate::{verify, WaitOutcome};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// A stream of raw text frames from a status channel.
///
/// `next_message` returns `None` when the peer closes; `close` is called by
/// the wait channel exactly once after resolution.
#[async_trait]
pub trait EventSource: Send {
    /// Next text frame, `None` once the channel is closed
    async fn next_message(&mut self) -> Option<Result<String>>;

    /// Release the underlying connection
    async fn close(&mut self);
}

/// Opens an [`EventSource`] for a channel URL
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Connect to a status channel
    async fn connect(&self, url: &str) -> Result<Box<dyn EventSource>>;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Websocket-backed event source
pub struct WebSocketSource {
    stream: WsStream,
}

#[async_trait]
impl EventSource for WebSocketSource {
    async fn next_message(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Control and binary frames carry no lifecycle information.
                Ok(_) => continue,
                Err(e) => return Some(Err(SignError::ChannelClosed(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Status channel close handshake failed");
        }
    }
}

/// Connector that dials the backend's websocket endpoint
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn EventSource>> {
        info!(%url, "Connecting to status channel");
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SignError::ChannelConnect(e.to_string()))?;
        Ok(Box::new(WebSocketSource { stream }))
    }
}

/// Observer for user-visible lifecycle moments
pub trait ProgressListener: Send + Sync {
    /// A sign request was created and its QR code can be shown
    fn on_sign_request(&self, _request: &SignRequest) {}

    /// The QR code was opened on the device
    fn on_opened(&self) {}
}

/// Listener that reports progress through the log
#[derive(Debug, Clone, Default)]
pub struct LogProgress;

impl ProgressListener for LogProgress {
    fn on_sign_request(&self, request: &SignRequest) {
        info!(request_id = %request.request_id, qr = %request.qr_png, "Scan the QR code to continue");
    }

    fn on_opened(&self) {
        info!("QR code opened on device");
    }
}

/// Wait-channel options
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitOptions {
    /// Overall wait limit. `None` waits until the channel resolves or
    /// closes, matching the interactive default.
    pub timeout: Option<Duration>,
}

impl WaitOptions {
    /// Bound the wait
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Phase of one wait-channel invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    AwaitingScan,
    Verifying,
}

/// One-shot wait for the resolution of a single sign request
pub struct WaitChannel {
    source: Box<dyn EventSource>,
    options: WaitOptions,
}

impl WaitChannel {
    /// Wrap an open event source
    pub fn new(source: Box<dyn EventSource>) -> Self {
        Self {
            source,
            options: WaitOptions::default(),
        }
    }

    /// Apply wait options
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Drive the channel to its terminal outcome.
    ///
    /// Consumes the channel; the connection is closed before the outcome is
    /// returned, on every path.
    pub async fn run(
        mut self,
        verifier: &dyn SigningBackend,
        progress: &dyn ProgressListener,
    ) -> WaitOutcome {
        let limit = self.options.timeout;
        let outcome = match limit {
            Some(limit) => {
                match tokio::time::timeout(limit, self.drive(verifier, progress)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(?limit, "Wait channel timed out");
                        WaitOutcome::Failed {
                            reason: format!("no terminal event within {limit:?}"),
                        }
                    }
                }
            }
            None => self.drive(verifier, progress).await,
        };
        self.source.close().await;
        outcome
    }

    async fn drive(
        &mut self,
        verifier: &dyn SigningBackend,
        progress: &dyn ProgressListener,
    ) -> WaitOutcome {
        let mut state = WaitState::AwaitingScan;
        loop {
            let Some(message) = self.source.next_message().await else {
                return WaitOutcome::Failed {
                    reason: "channel closed before a terminal event".to_string(),
                };
            };
            let text = match message {
                Ok(text) => text,
                Err(e) => {
                    return WaitOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let Some(event) = parse_event(&text) else {
                continue;
            };
            debug!(?state, ?event, "Channel event");

            match event {
                LifecycleEvent::Opened => progress.on_opened(),
                LifecycleEvent::ScannedPendingApproval { payload_id } => {
                    state = WaitState::Verifying;
                    debug!(?state, %payload_id, "Scan received, verifying approval");
                    return verify::confirm(verifier, &payload_id).await;
                }
                // Pre-resolved events skip the verification lookup.
                LifecycleEvent::ScannedApproved { signer, tx_id } => {
                    return WaitOutcome::Approved { signer, tx_id }
                }
                LifecycleEvent::ScannedRejected => return WaitOutcome::Rejected,
                LifecycleEvent::MalformedMessage { reason } => {
                    return WaitOutcome::Failed {
                        reason: format!("malformed channel message: {reason}"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) struct ScriptedSource {
        frames: VecDeque<Result<String>>,
        closed: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        pub(crate) fn new(
            frames: Vec<Result<String>>,
        ) -> (Box<dyn EventSource>, Arc<AtomicUsize>) {
            let closed = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    frames: frames.into(),
                    closed: closed.clone(),
                }),
                closed,
            )
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn next_message(&mut self) -> Option<Result<String>> {
            self.frames.pop_front()
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NoVerify;

    #[async_trait]
    impl SigningBackend for NoVerify {
        async fn generate_sign_request(
            &self,
            _tx: &medledger_core::TxPayload,
        ) -> Result<SignRequest> {
            unreachable!()
        }

        async fn check_approval(
            &self,
            _payload_id: &crate::PayloadId,
        ) -> Result<crate::backend::ApprovalCheck> {
            panic!("verification must not be reached")
        }

        async fn sign_in(&self, _signer: &str) -> Result<String> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_closed_channel_fails_and_closes_once() {
        let (source, closed) = ScriptedSource::new(vec![Ok(r#"{"opened": true}"#.into())]);
        let outcome = WaitChannel::new(source).run(&NoVerify, &LogProgress).await;
        assert!(outcome.is_failed());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_fails() {
        let (source, closed) = ScriptedSource::new(vec![Ok("garbage".into())]);
        let outcome = WaitChannel::new(source).run(&NoVerify, &LogProgress).await;
        assert!(outcome.is_failed());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_irrelevant_frames_skipped() {
        let (source, _closed) = ScriptedSource::new(vec![
            Ok(r#"{"expires_in_seconds": 599}"#.into()),
            Ok(r#"{"expires_in_seconds": 598}"#.into()),
        ]);
        let outcome = WaitChannel::new(source).run(&NoVerify, &LogProgress).await;
        // Stream ends without a terminal event.
        assert_eq!(
            outcome,
            WaitOutcome::Failed {
                reason: "channel closed before a terminal event".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_resolves_failed_and_closes() {
        struct Stalled;

        #[async_trait]
        impl EventSource for Stalled {
            async fn next_message(&mut self) -> Option<Result<String>> {
                futures_util::future::pending().await
            }

            async fn close(&mut self) {}
        }

        let channel = WaitChannel::new(Box::new(Stalled))
            .with_options(WaitOptions::default().with_timeout(Duration::from_millis(10)));
        let outcome = channel.run(&NoVerify, &LogProgress).await;
        assert!(outcome.is_failed());
    }
}
