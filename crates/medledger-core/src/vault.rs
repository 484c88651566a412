//! Encrypted record vault
//!
//! Records are sealed under a passcode the administrator enters at mint
//! time and are only ever stored or transmitted as ciphertext:
//!
//! - **MemoryRecordStore**: in-memory (testing)
//! - **FileRecordStore**: one JSON file per sealed record (development)
//!
//! Sealing uses ChaCha20-Poly1305 with a random nonce and salt; the key is
//! derived from the passcode and salt with sha256. A wrong passcode fails
//! authentication and surfaces as a recoverable decryption error.

use crate::{Error, MedicalRecord, Result};
use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A sealed medical record with the parameters needed to unseal it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedRecord {
    /// Encrypted record data
    pub ciphertext: Vec<u8>,
    /// Nonce used for encryption (12 bytes)
    pub nonce: [u8; 12],
    /// Key derivation salt (16 bytes)
    pub salt: [u8; 16],
    /// Creation timestamp
    pub created_at: i64,
    /// Version for future compatibility
    pub version: u32,
}

impl SealedRecord {
    /// Current version of the sealed record format
    pub const CURRENT_VERSION: u32 = 1;

    /// Seal a record under a passcode
    pub fn seal(record: &MedicalRecord, passcode: &str) -> Result<Self> {
        record.validate()?;

        let nonce_bytes: [u8; 12] = rand::random();
        let salt: [u8; 16] = rand::random();
        let cipher = ChaCha20Poly1305::new((&derive_key(passcode, &salt)).into());
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = serde_json::to_vec(record)?;
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|e| Error::Encryption(e.to_string()))?;

        Ok(Self {
            ciphertext,
            nonce: nonce_bytes,
            salt,
            created_at: chrono::Utc::now().timestamp(),
            version: Self::CURRENT_VERSION,
        })
    }

    /// Unseal the record with the passcode it was sealed under
    pub fn unseal(&self, passcode: &str) -> Result<MedicalRecord> {
        let cipher = ChaCha20Poly1305::new((&derive_key(passcode, &self.salt)).into());
        let nonce = Nonce::from_slice(&self.nonce);

        let plaintext = cipher
            .decrypt(nonce, self.ciphertext.as_ref())
            .map_err(|_| Error::Decryption("invalid passcode or corrupted record".into()))?;

        serde_json::from_slice(&plaintext).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Content id of the sealed blob (hex sha256 of its serialized form).
    /// Stable for a given blob, so it doubles as the store key and the
    /// reference anchored by the mint.
    pub fn content_id(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

fn derive_key(passcode: &str, salt: &[u8; 16]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(passcode.as_bytes());
    hasher.finalize().into()
}

/// Trait for sealed record storage backends
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a sealed record under its content id
    async fn store(&self, content_id: &str, record: &SealedRecord) -> Result<()>;

    /// Load a sealed record
    async fn load(&self, content_id: &str) -> Result<SealedRecord>;

    /// Check whether a record exists
    async fn exists(&self, content_id: &str) -> Result<bool>;

    /// List stored content ids
    async fn list(&self) -> Result<Vec<String>>;

    /// Delete a sealed record
    async fn delete(&self, content_id: &str) -> Result<()>;
}

/// In-memory record store
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<String, SealedRecord>>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn store(&self, content_id: &str, record: &SealedRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(content_id.to_string(), record.clone());
        Ok(())
    }

    async fn load(&self, content_id: &str) -> Result<SealedRecord> {
        self.records
            .read()
            .await
            .get(content_id)
            .cloned()
            .ok_or_else(|| Error::RecordNotFound(content_id.to_string()))
    }

    async fn exists(&self, content_id: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(content_id))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn delete(&self, content_id: &str) -> Result<()> {
        self.records
            .write()
            .await
            .remove(content_id)
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound(content_id.to_string()))
    }
}

/// File-system record store, one JSON file per sealed record
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, content_id: &str) -> Result<PathBuf> {
        // Content ids are hex digests; anything else is not a key we wrote.
        if !content_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(format!(
                "invalid content id: {content_id}"
            )));
        }
        Ok(self.dir.join(format!("{content_id}.json")))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn store(&self, content_id: &str, record: &SealedRecord) -> Result<()> {
        let path = self.path_for(content_id)?;
        let bytes = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn load(&self, content_id: &str) -> Result<SealedRecord> {
        let path = self.path_for(content_id)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| Error::RecordNotFound(content_id.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    async fn exists(&self, content_id: &str) -> Result<bool> {
        Ok(self.path_for(content_id)?.exists())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    async fn delete(&self, content_id: &str) -> Result<()> {
        let path = self.path_for(content_id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|_| Error::RecordNotFound(content_id.to_string()))
    }
}
