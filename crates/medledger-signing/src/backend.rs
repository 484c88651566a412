//! HTTP client for the backend API
//!
//! The backend is a black-box collaborator: it turns a transaction payload
//! into a QR-encoded signing request, answers approval lookups, and issues
//! session tokens. Network and HTTP failures all map to
//! [`SignError::BackendUnavailable`]; recovery is a manual user retry.

use crate::{PayloadId, Result, SignError, SignRequest};
use async_trait::async_trait;
use chrono::Utc;
use medledger_core::TxPayload;
use serde::Deserialize;
use tracing::{debug, info};

/// Backend client configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Create a new config
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout_secs: 30,
        }
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Result of an approval lookup
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalCheck {
    /// Whether the request was signed
    pub signed: bool,
    /// Signer address, present when signed
    #[serde(default)]
    pub signer: Option<String>,
    /// Ledger transaction id, present when the request carried a transaction
    #[serde(default)]
    pub txid: Option<String>,
}

/// Backend operations the sign-request lifecycle depends on
#[async_trait]
pub trait SigningBackend: Send + Sync {
    /// Submit a transaction payload for QR generation
    async fn generate_sign_request(&self, tx: &TxPayload) -> Result<SignRequest>;

    /// Check whether a signing request was completed and approved.
    /// Idempotent and safe to retry.
    async fn check_approval(&self, payload_id: &PayloadId) -> Result<ApprovalCheck>;

    /// Exchange an approved signer address for an encrypted session token
    async fn sign_in(&self, signer: &str) -> Result<String>;
}

/// HTTP implementation of [`SigningBackend`]
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

/// QR endpoint response envelope
#[derive(Debug, Deserialize)]
struct QrEnvelope {
    uuid: String,
    refs: QrRefs,
}

#[derive(Debug, Deserialize)]
struct QrRefs {
    qr_png: String,
    websocket_status: String,
}

impl HttpBackend {
    /// Create a backend client
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self::new(BackendConfig::new(base_url))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }
}

#[async_trait]
impl SigningBackend for HttpBackend {
    async fn generate_sign_request(&self, tx: &TxPayload) -> Result<SignRequest> {
        let url = self.endpoint("generateQR");
        debug!(%url, "Submitting transaction payload for QR generation");

        let response = self
            .client
            .post(&url)
            .json(tx)
            .send()
            .await
            .map_err(|e| SignError::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignError::BackendUnavailable(format!(
                "QR endpoint answered {}",
                response.status()
            )));
        }

        let envelope: QrEnvelope = response
            .json()
            .await
            .map_err(|e| SignError::Serialization(e.to_string()))?;

        info!(request_id = %envelope.uuid, "Signing request created");

        Ok(SignRequest {
            request_id: envelope.uuid,
            qr_png: envelope.refs.qr_png,
            channel_url: envelope.refs.websocket_status,
            created_at: Utc::now(),
        })
    }

    async fn check_approval(&self, payload_id: &PayloadId) -> Result<ApprovalCheck> {
        let url = self.endpoint("verifyUUID");
        debug!(%payload_id, "Checking approval status");

        let response = self
            .client
            .get(&url)
            .query(&[("uuid", payload_id.as_str())])
            .send()
            .await
            .map_err(|e| SignError::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignError::BackendUnavailable(format!(
                "verification endpoint answered {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SignError::Serialization(e.to_string()))
    }

    async fn sign_in(&self, signer: &str) -> Result<String> {
        let url = self.endpoint("signIn");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "userAddress": signer }))
            .send()
            .await
            .map_err(|e| SignError::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignError::BackendUnavailable(format!(
                "sign-in endpoint answered {}",
                response.status()
            )));
        }

        // The body is the encrypted token blob, either raw or JSON-quoted.
        let body = response
            .text()
            .await
            .map_err(|e| SignError::BackendUnavailable(e.to_string()))?;
        match serde_json::from_str::<String>(&body) {
            Ok(unquoted) => Ok(unquoted),
            Err(_) => Ok(body),
        }
    }
}
