//! Sign-request initiation
//!
//! Maps a caller intent to a ledger transaction payload and submits it to
//! the backend for QR generation. Initiation is fire-and-forget: nothing is
//! kept locally, and the returned [`SignRequest`] is the only handle to the
//! in-flight request.

use crate::{Result, SignError, SignRequest, SigningBackend};
use medledger_core::{RegistrationDetails, TxPayload};
use tracing::info;

/// What the caller wants signed
#[derive(Debug, Clone)]
pub enum SignIntent {
    /// Registration fee payment from a freshly generated account
    RegistrationFee {
        /// The registering account
        account: String,
        /// Patient metadata carried in the payment memo
        details: RegistrationDetails,
    },
    /// Mint a record token for an accepted registrant
    MintRecordToken {
        /// The registrant the token is for
        subject: String,
    },
    /// Sign-in challenge with no ledger effect
    SignIn,
}

impl SignIntent {
    /// Short label for logging
    pub fn describe(&self) -> &'static str {
        match self {
            SignIntent::RegistrationFee { .. } => "registration_fee",
            SignIntent::MintRecordToken { .. } => "mint_record_token",
            SignIntent::SignIn => "sign_in",
        }
    }
}

/// Builds transaction payloads and submits them for QR generation
pub struct Initiator<B: SigningBackend> {
    backend: B,
    /// Administrator account that receives fees and mints record tokens
    oracle_address: String,
}

impl<B: SigningBackend> Initiator<B> {
    /// Create an initiator
    pub fn new(backend: B, oracle_address: impl Into<String>) -> Self {
        Self {
            backend,
            oracle_address: oracle_address.into(),
        }
    }

    /// The backend this initiator submits to
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the transaction payload for an intent
    pub fn payload_for(&self, intent: &SignIntent) -> Result<TxPayload> {
        match intent {
            SignIntent::RegistrationFee { account, details } => {
                if account.is_empty() {
                    return Err(SignError::Invalid(medledger_core::Error::MissingField(
                        "account",
                    )));
                }
                Ok(TxPayload::registration_payment(
                    account,
                    &self.oracle_address,
                    details,
                )?)
            }
            SignIntent::MintRecordToken { subject } => {
                if subject.is_empty() {
                    return Err(SignError::Invalid(medledger_core::Error::MissingField(
                        "subject",
                    )));
                }
                Ok(TxPayload::record_mint(&self.oracle_address, subject))
            }
            SignIntent::SignIn => Ok(TxPayload::sign_in()),
        }
    }

    /// Submit an intent and return the QR handle for it
    pub async fn initiate(&self, intent: &SignIntent) -> Result<SignRequest> {
        let payload = self.payload_for(intent)?;
        let request = self.backend.generate_sign_request(&payload).await?;
        info!(
            intent = intent.describe(),
            request_id = %request.request_id,
            "Sign request initiated"
        );
        Ok(request)
    }
}
