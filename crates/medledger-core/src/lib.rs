//! # MedLedger Core
//!
//! Core library for a medical-records registry anchored on the XRP Ledger,
//! with transaction approval delegated to the user's mobile wallet app.
//!
//! This crate provides:
//! - **Account generation**: local ed25519 keypairs with classic address and
//!   family seed encodings, ready to import into the wallet app
//! - **Transaction shapes**: the mint, registration-payment, and sign-in
//!   payloads the signing service turns into QR codes
//! - **Ledger queries**: read-only JSON-RPC access backing the pending
//!   registration listing
//! - **Record vault**: passcode-sealed, content-addressed storage for
//!   medical records
//! - **Session context**: an explicit single-slot token store replacing
//!   ambient global state
//!
//! The ledger, the backend, and the signing service are external
//! collaborators; nothing in this crate signs or submits transactions
//! itself.

pub mod error;
pub mod ledger;
pub mod session;
pub mod tx;
pub mod types;
pub mod vault;
pub mod wallet;

pub use error::{Error, Result};
pub use ledger::{pending_registrations, JsonRpcLedger, LedgerClient};
pub use session::{ActiveSession, SessionCipher, SessionClaims, SessionContext};
pub use tx::{TxPayload, REGISTRATION_FEE_XRP};
pub use types::{
    Address, Gender, MedicalRecord, RecordReference, RegistrationDetails, RegistrationRequest,
    TxHash, UserRole,
};
pub use vault::{FileRecordStore, MemoryRecordStore, RecordStore, SealedRecord};
pub use wallet::{classic_address, is_valid_address, GeneratedAccount};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
