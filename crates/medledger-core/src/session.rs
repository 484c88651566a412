//! Session context and token handling
//!
//! The backend answers a successful sign-in with an opaque encrypted token
//! blob. The client decrypts it with the shared service key to read the
//! claims (role routing, error flag) and keeps the raw blob in an explicit
//! session context. The context is a single slot with last-writer-wins
//! semantics: concurrent logins are not coordinated, and callers must not
//! rely on them.

use crate::{Error, Result, UserRole};
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::RwLock;

fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Claims carried inside the session token blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Set when the signer is not a registered account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Role of the authenticated account
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    /// Authenticated account address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SessionClaims {
    /// Whether the backend accepted the signer
    pub fn is_authorized(&self) -> bool {
        self.error.is_none() && self.role.is_some()
    }
}

/// Decrypts (and, for tests, encrypts) session token blobs with the shared
/// service key. Blob layout: base64(salt ‖ nonce ‖ ciphertext).
pub struct SessionCipher {
    service_key: String,
}

impl SessionCipher {
    /// Salt length prefixing a token blob
    const SALT_LEN: usize = 16;
    /// Nonce length following the salt
    const NONCE_LEN: usize = 12;

    /// Create a cipher from the shared service key
    pub fn new(service_key: impl Into<String>) -> Self {
        Self {
            service_key: service_key.into(),
        }
    }

    fn derive_key(&self, salt: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(self.service_key.as_bytes());
        hasher.finalize().into()
    }

    /// Decrypt a token blob into its claims
    pub fn decrypt_claims(&self, blob: &str) -> Result<SessionClaims> {
        let bytes = b64()
            .decode(blob)
            .map_err(|e| Error::Session(format!("invalid token encoding: {e}")))?;
        if bytes.len() <= Self::SALT_LEN + Self::NONCE_LEN {
            return Err(Error::Session("token blob too short".into()));
        }

        let (salt, rest) = bytes.split_at(Self::SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(Self::NONCE_LEN);

        let cipher = ChaCha20Poly1305::new((&self.derive_key(salt)).into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Decryption("session token rejected".into()))?;

        serde_json::from_slice(&plaintext).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Encrypt claims into a token blob. The backend owns this direction in
    /// production; it lives here so tests and fixtures produce real blobs.
    pub fn encrypt_claims(&self, claims: &SessionClaims) -> Result<String> {
        let salt: [u8; Self::SALT_LEN] = rand::random();
        let nonce_bytes: [u8; Self::NONCE_LEN] = rand::random();

        let cipher = ChaCha20Poly1305::new((&self.derive_key(&salt)).into());
        let plaintext = serde_json::to_vec(claims)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut blob = Vec::with_capacity(Self::SALT_LEN + Self::NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(b64().encode(blob))
    }
}

/// An authenticated session held by the context
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Raw token blob as issued by the backend
    pub token: String,
    /// Decrypted claims
    pub claims: SessionClaims,
    /// When the session was stored
    pub signed_in_at: DateTime<Utc>,
}

/// Explicit session slot passed to workflows that need it.
#[derive(Clone, Default)]
pub struct SessionContext {
    slot: Arc<RwLock<Option<ActiveSession>>>,
}

impl SessionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session, replacing any previous one (last writer wins)
    pub async fn sign_in(&self, token: impl Into<String>, claims: SessionClaims) {
        let session = ActiveSession {
            token: token.into(),
            claims,
            signed_in_at: Utc::now(),
        };
        *self.slot.write().await = Some(session);
    }

    /// Drop the stored session, if any
    pub async fn sign_out(&self) {
        *self.slot.write().await = None;
    }

    /// Current session, if signed in
    pub async fn current(&self) -> Option<ActiveSession> {
        self.slot.read().await.clone()
    }

    /// Role of the current session
    pub async fn role(&self) -> Option<UserRole> {
        self.slot.read().await.as_ref().and_then(|s| s.claims.role)
    }

    /// Whether a session is stored
    pub async fn is_signed_in(&self) -> bool {
        self.slot.read().await.is_some()
    }
}
