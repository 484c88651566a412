//! Scripted backend and channel doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use medledger_core::TxPayload;
use medledger_signing::{
    ApprovalCheck, ChannelConnector, EventSource, PayloadId, Result, SignRequest, SigningBackend,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Backend double with a fixed approval answer and call accounting
pub struct MockBackend {
    pub approval: ApprovalCheck,
    pub token: String,
    pub verify_calls: AtomicUsize,
}

impl MockBackend {
    pub fn approving(signer: &str, txid: Option<&str>) -> Self {
        Self {
            approval: ApprovalCheck {
                signed: true,
                signer: Some(signer.to_string()),
                txid: txid.map(str::to_string),
            },
            token: String::new(),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn declining() -> Self {
        Self {
            approval: ApprovalCheck {
                signed: false,
                signer: None,
                txid: None,
            },
            token: String::new(),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }
}

#[async_trait]
impl SigningBackend for MockBackend {
    async fn generate_sign_request(&self, _tx: &TxPayload) -> Result<SignRequest> {
        Ok(SignRequest {
            request_id: "abc".into(),
            qr_png: "https://x/qr.png".into(),
            channel_url: "ws://x".into(),
            created_at: Utc::now(),
        })
    }

    async fn check_approval(&self, _payload_id: &PayloadId) -> Result<ApprovalCheck> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.approval.clone())
    }

    async fn sign_in(&self, _signer: &str) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Event source replaying a fixed frame script
pub struct ScriptedSource {
    frames: VecDeque<String>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn next_message(&mut self) -> Option<Result<String>> {
        self.frames.pop_front().map(Ok)
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector handing out one scripted source per connect
pub struct ScriptedConnector {
    frames: Mutex<Vec<String>>,
    pub closed: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(frames: &[&str]) -> Self {
        Self {
            frames: Mutex::new(frames.iter().map(|f| f.to_string()).collect()),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn source(&self) -> Box<dyn EventSource> {
        let frames = self.frames.lock().unwrap().clone();
        Box::new(ScriptedSource {
            frames: frames.into(),
            closed: self.closed.clone(),
        })
    }
}

#[async_trait]
impl ChannelConnector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn EventSource>> {
        Ok(self.source())
    }
}
