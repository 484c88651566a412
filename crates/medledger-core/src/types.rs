//! Core types for the medical-records registry

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An XRPL classic address (`r...`)
pub type Address = String;

/// A ledger transaction hash
pub type TxHash = String;

/// Role carried by a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Hospital administrator: can mint record tokens and approve requests
    Admin,
    /// Registered patient: can view their own records
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

/// Patient gender as recorded on the intake form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Registration metadata carried in the payment memo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDetails {
    /// Patient name
    pub name: String,
    /// Registering hospital
    pub hospital: String,
}

impl RegistrationDetails {
    /// Create registration details
    pub fn new(name: impl Into<String>, hospital: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hospital: hospital.into(),
        }
    }

    /// Required-field presence check. Anything beyond presence is the
    /// calling form's responsibility.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField("name"));
        }
        if self.hospital.trim().is_empty() {
            return Err(Error::MissingField("hospital"));
        }
        Ok(())
    }
}

/// A medical record as entered by an administrator, encrypted before it
/// ever leaves the process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    /// Patient name
    pub name: String,
    /// Patient age in years
    pub age: u32,
    /// Date of birth (YYYY-MM-DD)
    pub date_of_birth: String,
    /// Gender
    pub gender: Gender,
    /// Blood type (e.g. "O+")
    pub blood_type: String,
    /// Known allergies, if any
    pub allergies: Option<String>,
    /// Attached health record document (raw bytes)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment: Vec<u8>,
}

impl MedicalRecord {
    /// Required-field presence check
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField("name"));
        }
        if self.date_of_birth.trim().is_empty() {
            return Err(Error::MissingField("date_of_birth"));
        }
        if self.blood_type.trim().is_empty() {
            return Err(Error::MissingField("blood_type"));
        }
        Ok(())
    }
}

/// A registration request reconstructed from the oracle account's
/// transaction history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Requesting account address
    pub account: Address,
    /// Decoded memo metadata
    pub details: Option<RegistrationDetails>,
    /// Hash of the registration payment transaction
    pub tx_hash: TxHash,
    /// Whether a record token whose URI names this account already exists
    pub accepted: bool,
}

/// A stored record reference: content id plus the mint that anchors it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReference {
    /// Content id of the sealed record blob
    pub content_id: String,
    /// Account the record belongs to
    pub subject: Address,
    /// Mint transaction hash, once anchored on the ledger
    pub mint_tx: Option<TxHash>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl RecordReference {
    /// Create an unanchored reference for a freshly sealed record
    pub fn new(content_id: impl Into<String>, subject: impl Into<Address>) -> Self {
        Self {
            content_id: content_id.into(),
            subject: subject.into(),
            mint_tx: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the anchoring mint transaction
    pub fn with_mint_tx(mut self, tx: impl Into<TxHash>) -> Self {
        self.mint_tx = Some(tx.into());
        self
    }
}
